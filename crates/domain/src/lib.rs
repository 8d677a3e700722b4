//! # hearth-domain
//!
//! Pure domain model for the hearth heating controller.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define **Readings** (immutable sensor/controller records) and the
//!   per-tick **`ReadingSnapshot`** built from them
//! - Define the **site layout** (which location plays which role) and the
//!   controlled **components** (pump, heater, fan)
//! - Define **Targets** (setpoints, freeze prevention, deadband)
//! - Contain the **decision engine** and the **hysteresis gate**: pure
//!   functions from snapshot + targets to desired actuator states
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod component;
pub mod decision;
pub mod hysteresis;
pub mod layout;
pub mod reading;
pub mod snapshot;
pub mod targets;
