//! # hearth-adapter-virtual
//!
//! Simulated switches for dry runs and tests.
//!
//! ## Provided behaviour
//!
//! | Knob | Effect |
//! |------|--------|
//! | [`VirtualSwitch::set_failing`] | `turn_on` / `turn_off` return an actuator error |
//! | [`VirtualSwitch::set_unreachable`] | `is_on` returns an actuator error |
//! | [`VirtualSwitch::set_silent`] | `is_on` answers without a state |
//! | [`VirtualSwitch::set_latency`] | every call sleeps first |
//! | [`VirtualPlugs::remove`] | discovery no longer finds the alias |
//!
//! ## Dependency rule
//!
//! Depends on `hearth-app` (port traits) and `hearth-domain` only.

mod switch;

pub use switch::VirtualSwitch;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hearth_app::ports::SwitchDiscovery;
use hearth_domain::error::HearthError;

/// Registry of virtual switches, discoverable by alias.
#[derive(Debug, Default)]
pub struct VirtualPlugs {
    plugs: Mutex<HashMap<String, VirtualSwitch>>,
}

impl VirtualPlugs {
    /// A registry holding one switch, initially off, per alias.
    #[must_use]
    pub fn with_aliases<'a>(aliases: impl IntoIterator<Item = &'a str>) -> Self {
        let plugs = Self::default();
        for alias in aliases {
            plugs.insert(alias, VirtualSwitch::default());
        }
        plugs
    }

    /// Register (or replace) the switch answering to `alias`.
    pub fn insert(&self, alias: &str, switch: VirtualSwitch) {
        self.lock().insert(alias.to_string(), switch);
    }

    /// Make `alias` undiscoverable. Handles already given out keep working.
    pub fn remove(&self, alias: &str) -> Option<VirtualSwitch> {
        self.lock().remove(alias)
    }

    /// Shared handle to the switch registered under `alias`.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<VirtualSwitch> {
        self.lock().get(alias).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VirtualSwitch>> {
        self.plugs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SwitchDiscovery for VirtualPlugs {
    type Switch = VirtualSwitch;

    async fn discover(&self, alias: &str) -> Result<Option<VirtualSwitch>, HearthError> {
        let found = self.get(alias);
        tracing::debug!(alias, found = found.is_some(), "virtual discovery");
        Ok(found)
    }
}
