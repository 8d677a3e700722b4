//! In-memory fakes for the ports, shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hearth_domain::error::{BoxError, HearthError};
use hearth_domain::reading::Reading;
use tokio::time::Instant;

use crate::ports::{ReadingsStore, SmartSwitch, SwitchDiscovery};

#[derive(Default)]
pub struct InMemoryReadingsStore {
    readings: Mutex<Vec<Reading>>,
    written: Mutex<Vec<Reading>>,
    queries: AtomicUsize,
    fail_reads: AtomicBool,
}

impl InMemoryReadingsStore {
    pub fn with_readings(readings: Vec<Reading>) -> Self {
        Self {
            readings: Mutex::new(readings),
            ..Self::default()
        }
    }

    pub fn set_readings(&self, readings: Vec<Reading>) {
        *self.readings.lock().unwrap() = readings;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<Reading> {
        self.written.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl ReadingsStore for InMemoryReadingsStore {
    async fn get_current(
        &self,
        locations: &[&str],
        metrics: &[&str],
    ) -> Result<Vec<Reading>, HearthError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(HearthError::Storage(BoxError::from("database is locked")));
        }
        let readings = self.readings.lock().unwrap();
        Ok(readings
            .iter()
            .filter(|r| {
                locations.contains(&r.location.as_str()) && metrics.contains(&r.metric.as_str())
            })
            .cloned()
            .collect())
    }

    async fn put(&self, readings: Vec<Reading>) -> Result<(), HearthError> {
        self.written.lock().unwrap().extend(readings);
        Ok(())
    }
}

/// Observable state of a fake plug.
#[derive(Debug, Default)]
pub struct FakePlug {
    pub on: bool,
    pub commands: usize,
    pub status_reads: usize,
    pub fail_commands: bool,
    pub fail_status: bool,
    pub silent_status: bool,
    /// Apply the command, then never answer.
    pub hang_after_apply: bool,
    /// Every relay change, with the new state.
    pub flips: Vec<(Instant, bool)>,
}

#[derive(Clone, Default)]
pub struct FakeSwitch {
    pub plug: Arc<Mutex<FakePlug>>,
}

impl FakeSwitch {
    pub fn new(on: bool) -> Self {
        Self {
            plug: Arc::new(Mutex::new(FakePlug {
                on,
                ..FakePlug::default()
            })),
        }
    }

    pub fn is_on_now(&self) -> bool {
        self.plug.lock().unwrap().on
    }

    pub fn commands(&self) -> usize {
        self.plug.lock().unwrap().commands
    }

    pub fn flips(&self) -> Vec<(Instant, bool)> {
        self.plug.lock().unwrap().flips.clone()
    }

    /// Returns whether the plug hangs after applying.
    fn command(&self, on: bool) -> Result<bool, HearthError> {
        let mut plug = self.plug.lock().unwrap();
        plug.commands += 1;
        if plug.fail_commands {
            return Err(HearthError::Actuator(BoxError::from("connection refused")));
        }
        if plug.on != on {
            plug.on = on;
            plug.flips.push((Instant::now(), on));
        }
        Ok(plug.hang_after_apply)
    }

    async fn apply(&self, on: bool) -> Result<(), HearthError> {
        if self.command(on)? {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

impl SmartSwitch for FakeSwitch {
    async fn turn_on(&self) -> Result<(), HearthError> {
        self.apply(true).await
    }

    async fn turn_off(&self) -> Result<(), HearthError> {
        self.apply(false).await
    }

    async fn is_on(&self) -> Result<Option<bool>, HearthError> {
        let mut plug = self.plug.lock().unwrap();
        plug.status_reads += 1;
        if plug.fail_status {
            return Err(HearthError::Actuator(BoxError::from("host unreachable")));
        }
        if plug.silent_status {
            return Ok(None);
        }
        Ok(Some(plug.on))
    }
}

#[derive(Default)]
pub struct FakeDiscovery {
    plugs: Mutex<HashMap<String, FakeSwitch>>,
    calls: AtomicUsize,
}

impl FakeDiscovery {
    pub fn with(plugs: impl IntoIterator<Item = (&'static str, FakeSwitch)>) -> Self {
        Self {
            plugs: Mutex::new(
                plugs
                    .into_iter()
                    .map(|(alias, plug)| (alias.to_string(), plug))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn insert(&self, alias: &str, plug: FakeSwitch) {
        self.plugs.lock().unwrap().insert(alias.to_string(), plug);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SwitchDiscovery for FakeDiscovery {
    type Switch = FakeSwitch;

    async fn discover(&self, alias: &str) -> Result<Option<FakeSwitch>, HearthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.plugs.lock().unwrap().get(alias).cloned())
    }
}
