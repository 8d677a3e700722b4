//! Virtual switch — an in-memory relay with failure knobs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hearth_app::ports::SmartSwitch;
use hearth_domain::error::{BoxError, HearthError};

#[derive(Debug, Default)]
struct SwitchState {
    on: bool,
    toggles: usize,
    failing: bool,
    unreachable: bool,
    silent: bool,
    latency: Duration,
}

/// A simulated relay. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct VirtualSwitch {
    state: Arc<Mutex<SwitchState>>,
}

impl VirtualSwitch {
    /// A switch starting in the given position.
    #[must_use]
    pub fn new(on: bool) -> Self {
        let switch = Self::default();
        switch.lock().on = on;
        switch
    }

    /// Current relay position, bypassing every failure knob.
    #[must_use]
    pub fn is_on_now(&self) -> bool {
        self.lock().on
    }

    /// Flip the relay as if someone pressed the physical button.
    pub fn press(&self) {
        let mut state = self.lock();
        state.on = !state.on;
    }

    /// Number of accepted on/off commands.
    #[must_use]
    pub fn toggles(&self) -> usize {
        self.lock().toggles
    }

    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    fn lock(&self) -> MutexGuard<'_, SwitchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    async fn command(&self, on: bool) -> Result<(), HearthError> {
        self.delay().await;
        let mut state = self.lock();
        if state.failing {
            return Err(HearthError::Actuator(BoxError::from("virtual switch refused command")));
        }
        state.on = on;
        state.toggles += 1;
        Ok(())
    }
}

impl SmartSwitch for VirtualSwitch {
    async fn turn_on(&self) -> Result<(), HearthError> {
        self.command(true).await
    }

    async fn turn_off(&self) -> Result<(), HearthError> {
        self.command(false).await
    }

    async fn is_on(&self) -> Result<Option<bool>, HearthError> {
        self.delay().await;
        let state = self.lock();
        if state.unreachable {
            return Err(HearthError::Actuator(BoxError::from("virtual switch unreachable")));
        }
        if state.silent {
            return Ok(None);
        }
        Ok(Some(state.on))
    }
}
