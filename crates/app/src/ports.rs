//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the controller and the outside world.
//! They are defined here (in `app`) so that both the control loop and the
//! adapter crates can depend on them without creating circular dependencies.

pub mod readings_store;
pub mod switch;

pub use readings_store::ReadingsStore;
pub use switch::{SmartSwitch, SwitchDiscovery};
