//! Hysteresis gate — suppresses transitions near a threshold.
//!
//! The decision engine uses strict thresholds and no memory. The control
//! loop calls [`gate`] only when a freshly computed desired state differs
//! from what it believes the device is doing:
//!
//! - a transition to **on** is suppressed while the driving temperature is
//!   still above `threshold - deadband`;
//! - a transition to **off** is suppressed while it is still below
//!   `threshold + deadband`.
//!
//! The driving temperature depends on the component: room (desk)
//! temperature against the room target for the pump and the fan, tank
//! temperature against the tank target for the heater. On-transitions
//! driven by freeze prevention are never suppressed.

use crate::component::Component;
use crate::decision::MISSING_READING;
use crate::snapshot::ReadingSnapshot;
use crate::targets::Targets;

/// Verdict for one requested transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Go ahead and command the device.
    Apply,
    /// Keep the current state; the string explains why.
    Suppress(String),
}

impl Gate {
    #[must_use]
    pub fn is_apply(&self) -> bool {
        matches!(self, Self::Apply)
    }
}

/// The temperature and threshold a component's hysteresis is keyed on.
#[must_use]
pub fn driving_temperature(
    component: Component,
    snapshot: &ReadingSnapshot,
    targets: &Targets,
) -> (&'static str, Option<f64>, f64) {
    match component {
        Component::Pump | Component::Fan => ("room", snapshot.desk(), targets.target_room_temp),
        Component::Heater => ("tank", snapshot.tank(), targets.target_tank_temp),
    }
}

/// Decide whether a transition to `want_on` may be applied now.
#[must_use]
pub fn gate(
    component: Component,
    want_on: bool,
    freeze_protection: bool,
    snapshot: &ReadingSnapshot,
    targets: &Targets,
) -> Gate {
    if want_on && freeze_protection {
        return Gate::Apply;
    }

    let (label, temperature, threshold) = driving_temperature(component, snapshot, targets);
    let Some(temp) = temperature else {
        return Gate::Suppress(format!(
            "{MISSING_READING}: {label} temperature unavailable for hysteresis"
        ));
    };

    if want_on {
        let lower = threshold - targets.deadband;
        if temp > lower {
            return Gate::Suppress(format!(
                "Not turning {component} on: {label} temperature {temp:.1}F above lower threshold {lower:.1}F"
            ));
        }
    } else {
        let upper = threshold + targets.deadband;
        if temp < upper {
            return Gate::Suppress(format!(
                "Not turning {component} off: {label} temperature {temp:.1}F below upper threshold {upper:.1}F"
            ));
        }
    }

    Gate::Apply
}
