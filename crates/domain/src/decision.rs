//! Decision engine — maps a [`ReadingSnapshot`] and [`Targets`] to the
//! desired state of every component.
//!
//! Pure and stateless: no I/O, no clock, no memory of previous ticks.
//! Hysteresis lives in [`crate::hysteresis`] and is applied by the control
//! loop, which is the only place that knows the believed device state.
//!
//! Priority when rules conflict: **freeze prevention** > **comfort / tank
//! heating coupling** > **idle**.
//!
//! Missing readings are handled with three-valued logic. Every factor is
//! known-true, known-false or unknown (`None`); a component whose result is
//! unknown gets [`DesiredState::Unchanged`] instead of a guess.

use std::fmt;

use crate::component::{Component, PerComponent};
use crate::snapshot::ReadingSnapshot;
use crate::targets::Targets;

/// Every reason produced for an undecidable component starts with this.
pub const MISSING_READING: &str = "missing reading";

/// What the engine wants a component to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesiredState {
    On,
    Off,
    /// Not enough information; leave the component as it is.
    Unchanged,
}

impl DesiredState {
    fn from_known(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::On,
            Some(false) => Self::Off,
            None => Self::Unchanged,
        }
    }

    /// `Some(on)` for a concrete request, `None` for [`Unchanged`](Self::Unchanged).
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            Self::Unchanged => None,
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Unchanged => f.write_str("unchanged"),
        }
    }
}

/// One intermediate conclusion with its explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factor {
    /// `None` when a required reading was absent.
    pub value: Option<bool>,
    pub reason: String,
}

impl Factor {
    fn known(value: bool, reason: String) -> Self {
        Self {
            value: Some(value),
            reason,
        }
    }

    fn unknown(reason: String) -> Self {
        Self {
            value: None,
            reason,
        }
    }

    fn is_true(&self) -> bool {
        self.value == Some(true)
    }
}

/// The four factors the component rules are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatingFactors {
    pub need_room_heat: Factor,
    pub can_heat_from_tank: Factor,
    pub need_tank_heat: Factor,
    pub pipe_freeze_risk: Factor,
}

/// Outcome for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDecision {
    pub desired: DesiredState,
    /// The request is (at least partly) driven by freeze prevention.
    pub freeze_protection: bool,
    pub reason: String,
}

/// Per-tick decision record. Logged and partially written back as telemetry,
/// never persisted as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlDecision {
    pub factors: HeatingFactors,
    pub components: PerComponent<ComponentDecision>,
}

impl ControlDecision {
    #[must_use]
    pub fn desired(&self, component: Component) -> DesiredState {
        self.components.get(component).desired
    }

    #[must_use]
    pub fn reason(&self, component: Component) -> &str {
        &self.components.get(component).reason
    }

    #[must_use]
    pub fn pump_on(&self) -> Option<bool> {
        self.components.pump.desired.as_bool()
    }

    #[must_use]
    pub fn heater_on(&self) -> Option<bool> {
        self.components.heater.desired.as_bool()
    }

    #[must_use]
    pub fn fan_on(&self) -> Option<bool> {
        self.components.fan.desired.as_bool()
    }
}

/// Run every rule against one snapshot.
#[must_use]
pub fn decide(snapshot: &ReadingSnapshot, targets: &Targets) -> ControlDecision {
    let need_room_heat = evaluate_room_heating_need(snapshot.desk(), targets);
    let can_heat_from_tank = can_heat_from_tank(snapshot.tank(), targets);
    let need_tank_heat = evaluate_tank_heating_need(snapshot.tank(), need_room_heat.value, targets);
    let pipe_freeze_risk = check_pipe_freeze_risk(snapshot, targets);

    let factors = HeatingFactors {
        need_room_heat,
        can_heat_from_tank,
        need_tank_heat,
        pipe_freeze_risk,
    };

    let tank_freezing = snapshot
        .tank()
        .is_some_and(|tank| tank < targets.freeze_prevention_temp);

    let components = PerComponent {
        pump: decide_pump(&factors, tank_freezing),
        heater: decide_heater(&factors, tank_freezing),
        fan: decide_fan(&factors, snapshot),
    };

    ControlDecision {
        factors,
        components,
    }
}

/// `desk < target_room_temp` (strict).
#[must_use]
pub fn evaluate_room_heating_need(desk: Option<f64>, targets: &Targets) -> Factor {
    let target = targets.target_room_temp;
    match desk {
        None => Factor::unknown(format!("{MISSING_READING}: desk temperature unavailable")),
        Some(desk) if desk < target => Factor::known(
            true,
            format!("Room temperature ({desk:.1}F) below target ({target:.1}F)"),
        ),
        Some(desk) => Factor::known(
            false,
            format!("Room temperature ({desk:.1}F) at or above target ({target:.1}F)"),
        ),
    }
}

/// `tank >= target_tank_temp - deadband`.
#[must_use]
pub fn can_heat_from_tank(tank: Option<f64>, targets: &Targets) -> Factor {
    let threshold = targets.target_tank_temp - targets.deadband;
    match tank {
        None => Factor::unknown(format!("{MISSING_READING}: tank temperature unavailable")),
        Some(tank) if tank >= threshold => Factor::known(
            true,
            format!("Tank temperature ({tank:.1}F) sufficient for heating (>= {threshold:.1}F)"),
        ),
        Some(tank) => Factor::known(
            false,
            format!(
                "Tank temperature ({tank:.1}F) too low for effective heating (< {threshold:.1}F)"
            ),
        ),
    }
}

/// With room demand: heat whenever `tank < target_tank_temp`.
/// Without room demand: heat only when `tank < freeze_prevention_temp`.
///
/// With unknown room demand the factor is still known when both branches
/// agree.
#[must_use]
pub fn evaluate_tank_heating_need(
    tank: Option<f64>,
    need_room_heat: Option<bool>,
    targets: &Targets,
) -> Factor {
    let target = targets.target_tank_temp;
    let freeze = targets.freeze_prevention_temp;
    let Some(tank) = tank else {
        return Factor::unknown(format!("{MISSING_READING}: tank temperature unavailable"));
    };

    match need_room_heat {
        Some(true) if tank < target => Factor::known(
            true,
            format!("Tank temperature ({tank:.1}F) below target ({target:.1}F) and room needs heat"),
        ),
        Some(true) => Factor::known(
            false,
            format!("Tank temperature ({tank:.1}F) sufficient for room heating (>= {target:.1}F)"),
        ),
        Some(false) if tank < freeze => Factor::known(
            true,
            format!("Tank temperature ({tank:.1}F) approaching freezing (< {freeze:.1}F)"),
        ),
        Some(false) => Factor::known(
            false,
            format!(
                "Tank temperature ({tank:.1}F) above freeze prevention threshold ({freeze:.1}F), no heating needed"
            ),
        ),
        None => {
            let comfort = tank < target;
            let freezing = tank < freeze;
            if comfort == freezing {
                let verdict = if freezing { "below" } else { "at or above" };
                Factor::known(
                    freezing,
                    format!(
                        "Tank temperature ({tank:.1}F) {verdict} both target ({target:.1}F) and freeze prevention threshold ({freeze:.1}F)"
                    ),
                )
            } else {
                Factor::unknown(format!(
                    "{MISSING_READING}: room demand unknown, tank temperature ({tank:.1}F) needs it to decide"
                ))
            }
        }
    }
}

/// True when any known pipe-segment temperature is below the freeze
/// prevention temperature. Absent pipe readings are ignored.
#[must_use]
pub fn check_pipe_freeze_risk(snapshot: &ReadingSnapshot, targets: &Targets) -> Factor {
    let freeze = targets.freeze_prevention_temp;
    match snapshot.pipes().iter().find(|(_, temp)| *temp < freeze) {
        Some((location, temp)) => Factor::known(
            true,
            format!(
                "{location} temperature ({temp:.1}F) below freeze prevention threshold ({freeze:.1}F)"
            ),
        ),
        None => Factor::known(
            false,
            "No freeze risk in pipes (all temperatures above freeze prevention threshold)"
                .to_string(),
        ),
    }
}

/// `need_tank_heat OR pipe_freeze_risk OR (need_room_heat AND can_heat_from_tank)`.
fn decide_pump(factors: &HeatingFactors, tank_freezing: bool) -> ComponentDecision {
    let distribute = all_true(
        factors.need_room_heat.value,
        factors.can_heat_from_tank.value,
    );
    let value = any_true(
        factors.need_tank_heat.value,
        any_true(factors.pipe_freeze_risk.value, distribute),
    );

    let reason = if factors.pipe_freeze_risk.is_true() {
        format!("pipe freeze prevention: {}", factors.pipe_freeze_risk.reason)
    } else if factors.need_tank_heat.is_true() {
        format!("charging tank: {}", factors.need_tank_heat.reason)
    } else if distribute == Some(true) {
        format!(
            "distributing heat from tank: {}; {}",
            factors.need_room_heat.reason, factors.can_heat_from_tank.reason
        )
    } else if value.is_none() {
        missing_reason(&[
            &factors.need_room_heat,
            &factors.can_heat_from_tank,
            &factors.need_tank_heat,
        ])
    } else {
        format!(
            "idle: {}; {}",
            factors.need_room_heat.reason, factors.can_heat_from_tank.reason
        )
    };

    let freeze_protection =
        factors.pipe_freeze_risk.is_true() || (tank_freezing && factors.need_tank_heat.is_true());

    ComponentDecision {
        desired: DesiredState::from_known(value),
        freeze_protection,
        reason,
    }
}

/// `need_tank_heat`.
fn decide_heater(factors: &HeatingFactors, tank_freezing: bool) -> ComponentDecision {
    let need = &factors.need_tank_heat;
    let reason = match need.value {
        Some(true) => format!("charging tank: {}", need.reason),
        Some(false) => format!("tank heating not needed: {}", need.reason),
        None => missing_reason(&[&factors.need_room_heat, need]),
    };

    ComponentDecision {
        desired: DesiredState::from_known(need.value),
        freeze_protection: tank_freezing && need.is_true(),
        reason,
    }
}

/// `need_room_heat AND floor known AND desk known AND floor > desk`.
fn decide_fan(factors: &HeatingFactors, snapshot: &ReadingSnapshot) -> ComponentDecision {
    let (desired, reason) = match (factors.need_room_heat.value, snapshot.floor(), snapshot.desk())
    {
        (None, _, _) | (_, _, None) => (
            DesiredState::Unchanged,
            missing_reason(&[&factors.need_room_heat]),
        ),
        (Some(false), _, _) => (
            DesiredState::Off,
            format!("room needs no heat: {}", factors.need_room_heat.reason),
        ),
        (Some(true), None, Some(_)) => (
            DesiredState::Off,
            "floor temperature unknown, no floor-to-desk circulation".to_string(),
        ),
        (Some(true), Some(floor), Some(desk)) if floor > desk => (
            DesiredState::On,
            format!("floor ({floor:.1}F) warmer than desk ({desk:.1}F) and room needs heat"),
        ),
        (Some(true), Some(floor), Some(desk)) => (
            DesiredState::Off,
            format!("floor ({floor:.1}F) not warmer than desk ({desk:.1}F)"),
        ),
    };

    ComponentDecision {
        desired,
        freeze_protection: false,
        reason,
    }
}

fn missing_reason(factors: &[&Factor]) -> String {
    let details: Vec<&str> = factors
        .iter()
        .filter(|f| f.value.is_none())
        .map(|f| f.reason.as_str())
        .collect();
    format!("{MISSING_READING}, no change requested ({})", details.join("; "))
}

/// Three-valued OR: true if either is known true, false only if both are
/// known false.
fn any_true(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// Three-valued AND: false if either is known false, true only if both are
/// known true.
fn all_true(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}
