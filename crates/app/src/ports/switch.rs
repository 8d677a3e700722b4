//! Switch ports — discovery and control of networked on/off switches.
//!
//! Implementations live in adapter crates (e.g. `adapter_kasa`). None of
//! these calls is assumed to be bounded; the [`ActuatorHandle`] wraps each
//! one in a timeout.
//!
//! [`ActuatorHandle`]: crate::actuator::ActuatorHandle

use std::future::Future;

use hearth_domain::error::HearthError;

/// Locates a switch on the network by its configured alias.
pub trait SwitchDiscovery: Send + Sync {
    /// The handle type produced for a found switch.
    type Switch: SmartSwitch;

    /// Look for a switch named `alias`.
    ///
    /// Returns `Ok(None)` when the search completed without a match.
    fn discover(
        &self,
        alias: &str,
    ) -> impl Future<Output = Result<Option<Self::Switch>, HearthError>> + Send;
}

/// A single on/off switch.
pub trait SmartSwitch: Send + Sync {
    /// Energise the relay.
    fn turn_on(&self) -> impl Future<Output = Result<(), HearthError>> + Send;

    /// De-energise the relay.
    fn turn_off(&self) -> impl Future<Output = Result<(), HearthError>> + Send;

    /// Current relay state, `Ok(None)` when the device answered without
    /// reporting one.
    fn is_on(&self) -> impl Future<Output = Result<Option<bool>, HearthError>> + Send;
}
