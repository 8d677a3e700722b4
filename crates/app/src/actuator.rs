//! Actuator handle — one physical switch and everything the controller
//! remembers about it.
//!
//! The handle owns the switch connection, the believed on/off state, the
//! time of the last toggle command and the bookkeeping needed to throttle
//! reconnect attempts. Every device call is bounded by a timeout; no failure
//! escapes as an error, each one is folded into an outcome value and logged.
//!
//! Cooldowns are measured on the monotonic clock (`tokio::time::Instant`),
//! so wall-clock jumps cannot shorten or extend them.

use std::sync::Arc;
use std::time::Duration;

use hearth_domain::component::Component;
use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::layout::metric;
use hearth_domain::reading::Reading;
use tokio::time::{Instant, sleep, timeout};

use crate::ports::{ReadingsStore, SmartSwitch, SwitchDiscovery};

/// Minimum time between two toggles, per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    /// Required quiet time before turning on.
    pub on: Duration,
    /// Required quiet time before turning off.
    pub off: Duration,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self {
            on: Duration::from_secs(180),
            off: Duration::from_secs(600),
        }
    }
}

impl Cooldown {
    #[must_use]
    pub fn for_direction(&self, turn_on: bool) -> Duration {
        if turn_on { self.on } else { self.off }
    }
}

/// Timing knobs of one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorSettings {
    pub cooldown: Cooldown,
    /// Upper bound for a single on/off/status call.
    pub command_timeout: Duration,
    /// Upper bound for a single discovery attempt.
    pub discovery_timeout: Duration,
    /// Discovery attempts per acquisition, at least one.
    pub discovery_attempts: u32,
    /// Pause after the first failed attempt, doubled after each further one.
    pub discovery_backoff: Duration,
    /// Time without a successful status read after which a reconnect is
    /// attempted; also the minimum spacing between two reconnects.
    pub staleness: Duration,
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        Self {
            cooldown: Cooldown::default(),
            command_timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(10),
            discovery_attempts: 3,
            discovery_backoff: Duration::from_secs(5),
            staleness: Duration::from_secs(30),
        }
    }
}

/// What the handle knows about its switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorState {
    /// `None` until the first status read or toggle.
    pub believed_on: Option<bool>,
    /// When the last on/off command was sent, acknowledged or not. A command
    /// that errors may still have switched the relay.
    pub last_toggle: Option<Instant>,
    pub last_successful_update: Option<Instant>,
    pub last_reconnect_attempt: Option<Instant>,
}

/// Result of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Found,
    NotFound,
}

/// Result of [`ActuatorHandle::turn_on`] / [`ActuatorHandle::turn_off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Believed state already matched; nothing was sent.
    AlreadyInState,
    /// The device acknowledged the command.
    Toggled,
    /// Cooldown still running.
    Deferred { remaining: Duration },
    /// The command failed or timed out; belief unchanged, cooldown started.
    Failed,
    /// No switch has been acquired.
    Unavailable,
}

/// Result of [`ActuatorHandle::refresh_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRefresh {
    /// The device agrees with the believed state.
    Confirmed(bool),
    /// The device disagreed (or nothing was believed yet); belief updated.
    Corrected { from: Option<bool>, to: bool },
    /// The device answered without a state.
    Unknown { reconnected: bool },
    /// The read failed or timed out.
    Failed { reconnected: bool },
}

/// Handle over one physical switch.
pub struct ActuatorHandle<D: SwitchDiscovery, R> {
    component: Component,
    alias: String,
    location: String,
    discovery: Arc<D>,
    store: Arc<R>,
    settings: ActuatorSettings,
    switch: Option<D::Switch>,
    state: ActuatorState,
}

impl<D, R> ActuatorHandle<D, R>
where
    D: SwitchDiscovery,
    R: ReadingsStore,
{
    /// Create a handle. No device is contacted until [`acquire`](Self::acquire).
    ///
    /// `location` is where toggle telemetry is recorded.
    pub fn new(
        component: Component,
        alias: impl Into<String>,
        location: impl Into<String>,
        discovery: Arc<D>,
        store: Arc<R>,
        settings: ActuatorSettings,
    ) -> Self {
        Self {
            component,
            alias: alias.into(),
            location: location.into(),
            discovery,
            store,
            settings,
            switch: None,
            state: ActuatorState::default(),
        }
    }

    #[must_use]
    pub fn component(&self) -> Component {
        self.component
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[must_use]
    pub fn believed_on(&self) -> Option<bool> {
        self.state.believed_on
    }

    #[must_use]
    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    #[must_use]
    pub fn is_acquired(&self) -> bool {
        self.switch.is_some()
    }

    /// Locate the switch by alias and read its initial status.
    ///
    /// Retries with exponential backoff. On failure the previously acquired
    /// switch, if any, is kept.
    pub async fn acquire(&mut self) -> Acquire {
        self.state.last_reconnect_attempt = Some(Instant::now());
        let attempts = self.settings.discovery_attempts.max(1);
        let mut backoff = self.settings.discovery_backoff;

        for attempt in 1..=attempts {
            tracing::info!(component = %self.component, alias = %self.alias, attempt, "discovering switch");
            match timeout(
                self.settings.discovery_timeout,
                self.discovery.discover(&self.alias),
            )
            .await
            {
                Ok(Ok(Some(switch))) => {
                    tracing::info!(component = %self.component, alias = %self.alias, "switch found");
                    self.switch = Some(switch);
                    if let Err(err) = self.poll_status().await {
                        tracing::warn!(component = %self.component, error = %err, "initial status read failed");
                    }
                    return Acquire::Found;
                }
                Ok(Ok(None)) => {
                    tracing::warn!(component = %self.component, alias = %self.alias, attempt, "switch not found");
                }
                Ok(Err(err)) => {
                    tracing::warn!(component = %self.component, alias = %self.alias, attempt, error = %err, "switch discovery failed");
                }
                Err(_) => {
                    tracing::warn!(
                        component = %self.component,
                        alias = %self.alias,
                        attempt,
                        timeout = ?self.settings.discovery_timeout,
                        "switch discovery timed out"
                    );
                }
            }
            if attempt < attempts {
                sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }

        tracing::error!(component = %self.component, alias = %self.alias, attempts, "could not acquire switch");
        Acquire::NotFound
    }

    /// Request the switch to be on.
    pub async fn turn_on(&mut self) -> ToggleOutcome {
        self.switch_to(true).await
    }

    /// Request the switch to be off.
    pub async fn turn_off(&mut self) -> ToggleOutcome {
        self.switch_to(false).await
    }

    async fn switch_to(&mut self, on: bool) -> ToggleOutcome {
        let direction = if on { "on" } else { "off" };
        if self.state.believed_on == Some(on) {
            tracing::debug!(component = %self.component, direction, "already in requested state");
            return ToggleOutcome::AlreadyInState;
        }

        let cooldown = self.settings.cooldown.for_direction(on);
        if let Some(last) = self.state.last_toggle {
            let elapsed = last.elapsed();
            if elapsed < cooldown {
                let remaining = cooldown - elapsed;
                tracing::info!(
                    component = %self.component,
                    direction,
                    remaining_secs = remaining.as_secs(),
                    "toggle deferred by cooldown"
                );
                return ToggleOutcome::Deferred { remaining };
            }
        }

        let Some(switch) = self.switch.as_ref() else {
            tracing::warn!(component = %self.component, direction, "no switch acquired");
            return ToggleOutcome::Unavailable;
        };

        self.state.last_toggle = Some(Instant::now());
        let command = async {
            if on {
                switch.turn_on().await
            } else {
                switch.turn_off().await
            }
        };
        match timeout(self.settings.command_timeout, command).await {
            Ok(Ok(())) => {
                self.state.believed_on = Some(on);
                self.state.last_successful_update = Some(Instant::now());
                tracing::info!(component = %self.component, alias = %self.alias, direction, "switch toggled");
                self.record_toggle(on).await;
                ToggleOutcome::Toggled
            }
            Ok(Err(err)) => {
                tracing::error!(component = %self.component, direction, error = %err, "switch command failed");
                ToggleOutcome::Failed
            }
            Err(_) => {
                tracing::error!(
                    component = %self.component,
                    direction,
                    timeout = ?self.settings.command_timeout,
                    "switch command timed out"
                );
                ToggleOutcome::Failed
            }
        }
    }

    /// Re-read the device state and reconcile the believed state with it.
    ///
    /// When the state cannot be read and nothing was heard from the device
    /// for longer than the staleness window, the switch is re-acquired, at
    /// most once per window.
    pub async fn refresh_status(&mut self) -> StatusRefresh {
        let previous = self.state.believed_on;
        match self.poll_status().await {
            Ok(Some(on)) if previous == Some(on) => StatusRefresh::Confirmed(on),
            Ok(Some(on)) => {
                if let Some(from) = previous {
                    tracing::warn!(component = %self.component, believed = from, actual = on, "switch state drifted");
                }
                StatusRefresh::Corrected { from: previous, to: on }
            }
            Ok(None) => {
                tracing::warn!(component = %self.component, "switch reported no state");
                let reconnected = self.maybe_reconnect().await;
                StatusRefresh::Unknown { reconnected }
            }
            Err(err) => {
                tracing::warn!(component = %self.component, error = %err, "status read failed");
                let reconnected = self.maybe_reconnect().await;
                StatusRefresh::Failed { reconnected }
            }
        }
    }

    async fn poll_status(&mut self) -> Result<Option<bool>, HearthError> {
        let Some(switch) = self.switch.as_ref() else {
            return Err(NotFoundError {
                entity: "Switch",
                id: self.alias.clone(),
            }
            .into());
        };
        let status = timeout(self.settings.command_timeout, switch.is_on())
            .await
            .map_err(|_| HearthError::Timeout(self.settings.command_timeout))??;
        if let Some(on) = status {
            self.state.believed_on = Some(on);
            self.state.last_successful_update = Some(Instant::now());
        }
        Ok(status)
    }

    async fn maybe_reconnect(&mut self) -> bool {
        let now = Instant::now();
        let window = self.settings.staleness;
        let stale = self
            .state
            .last_successful_update
            .is_none_or(|at| now.duration_since(at) > window);
        let throttled = self
            .state
            .last_reconnect_attempt
            .is_some_and(|at| now.duration_since(at) < window);
        if !stale || throttled {
            return false;
        }
        tracing::info!(component = %self.component, alias = %self.alias, "reconnecting to stale switch");
        matches!(self.acquire().await, Acquire::Found)
    }

    async fn record_toggle(&self, on: bool) {
        let reading = match Reading::builder()
            .location(&self.location)
            .metric(metric::control_state(self.component))
            .state(if on { "on" } else { "off" })
            .build()
        {
            Ok(reading) => reading,
            Err(err) => {
                tracing::warn!(component = %self.component, error = %err, "invalid control state reading");
                return;
            }
        };
        if let Err(err) = self.store.put(vec![reading]).await {
            tracing::warn!(component = %self.component, error = %err, "failed to record control state");
        }
    }
}
