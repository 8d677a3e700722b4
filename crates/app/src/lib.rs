//! # hearth-app
//!
//! Application layer — the closed-loop controller and its **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ReadingsStore` — latest readings by location/metric, batch writes
//!   - `SwitchDiscovery` — locate a smart switch by its alias
//!   - `SmartSwitch` — turn on, turn off, read relay status
//! - Own the temporal and stateful side of control:
//!   - `ActuatorHandle` — one physical switch: cooldowns, believed state,
//!     bounded reconnects, toggle telemetry
//!   - `ControlLoop` — per-tick fetch → decide → gate → actuate → re-poll →
//!     persist
//! - Keep every device and store call bounded by an explicit timeout
//!
//! ## Dependency rule
//! Depends on `hearth-domain` only (plus `tokio` time/sync and `tracing`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actuator;
pub mod control_loop;
pub mod ports;

#[cfg(test)]
mod testing;
