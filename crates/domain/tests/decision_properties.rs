//! Property tests for the decision engine and the hysteresis gate.

use std::collections::BTreeMap;

use hearth_domain::component::Component;
use hearth_domain::decision::{DesiredState, MISSING_READING, decide};
use hearth_domain::hysteresis::gate;
use hearth_domain::layout::SiteLayout;
use hearth_domain::snapshot::ReadingSnapshot;
use hearth_domain::targets::Targets;
use proptest::prelude::*;

fn targets_strategy() -> impl Strategy<Value = Targets> {
    (30.0..80.0f64, 100.0..160.0f64, 32.0..45.0f64, 0.0..5.0f64).prop_map(
        |(room, tank, freeze, deadband)| Targets {
            target_room_temp: room,
            target_tank_temp: tank,
            freeze_prevention_temp: freeze,
            deadband,
        },
    )
}

fn snapshot_of(values: &[(&str, Option<f64>)]) -> ReadingSnapshot {
    let map: BTreeMap<String, f64> = values
        .iter()
        .filter_map(|(loc, v)| v.map(|v| ((*loc).to_string(), v)))
        .collect();
    ReadingSnapshot::from_values(map, &SiteLayout::default())
}

proptest! {
    /// A cold room with a charged tank always gets the pump.
    #[test]
    fn pump_runs_when_room_cold_and_tank_charged(
        targets in targets_strategy(),
        room_gap in 0.01..30.0f64,
        tank_excess in 0.0..40.0f64,
        floor in proptest::option::of(0.0..100.0f64),
    ) {
        let desk = targets.target_room_temp - targets.deadband - room_gap;
        let tank = targets.target_tank_temp - targets.deadband + tank_excess;
        let snap = snapshot_of(&[
            ("ambient/desk", Some(desk)),
            ("heating/tank", Some(tank)),
            ("heating/floor", floor),
        ]);
        let decision = decide(&snap, &targets);
        prop_assert_eq!(decision.pump_on(), Some(true));
    }

    /// Any pipe below the freeze temperature forces the pump on, whatever
    /// the room and tank are doing (or whether they are known at all).
    #[test]
    fn freeze_prevention_dominates_pump(
        targets in targets_strategy(),
        desk in proptest::option::of(-10.0..100.0f64),
        tank in proptest::option::of(-10.0..200.0f64),
        pipe_index in 0usize..4,
        below in 0.01..40.0f64,
    ) {
        let layout = SiteLayout::default();
        let pipe = layout.pipes[pipe_index].clone();
        let snap = snapshot_of(&[
            ("ambient/desk", desk),
            ("heating/tank", tank),
            (pipe.as_str(), Some(targets.freeze_prevention_temp - below)),
        ]);
        let decision = decide(&snap, &targets);
        prop_assert_eq!(decision.pump_on(), Some(true));
        prop_assert!(decision.components.pump.freeze_protection);
        // and the gate never holds it back
        prop_assert!(gate(Component::Pump, true, true, &snap, &targets).is_apply());
    }

    /// Without a desk reading, the fan is never switched and every
    /// undecidable component carries a missing-reading reason.
    #[test]
    fn missing_desk_never_guesses(
        targets in targets_strategy(),
        tank in proptest::option::of(-10.0..200.0f64),
        floor in proptest::option::of(45.0..100.0f64),
    ) {
        let snap = snapshot_of(&[("heating/tank", tank), ("heating/floor", floor)]);
        let decision = decide(&snap, &targets);
        prop_assert_eq!(decision.desired(Component::Fan), DesiredState::Unchanged);
        for component in Component::ALL {
            if decision.desired(component) == DesiredState::Unchanged {
                prop_assert!(decision.reason(component).starts_with(MISSING_READING));
            }
        }
    }

    /// The heater always follows the tank heating factor.
    #[test]
    fn heater_follows_tank_heating_need(
        targets in targets_strategy(),
        desk in proptest::option::of(-10.0..100.0f64),
        tank in proptest::option::of(-10.0..200.0f64),
    ) {
        let snap = snapshot_of(&[("ambient/desk", desk), ("heating/tank", tank)]);
        let decision = decide(&snap, &targets);
        prop_assert_eq!(decision.heater_on(), decision.factors.need_tank_heat.value);
    }

    /// Inside the deadband no transition is ever applied (absent freeze
    /// protection), in either direction.
    #[test]
    fn gate_holds_inside_deadband(
        targets in targets_strategy().prop_filter("deadband", |t| t.deadband > 0.1),
        offset in -0.99..0.99f64,
        want_on in any::<bool>(),
    ) {
        let desk = targets.target_room_temp + offset * targets.deadband;
        let snap = snapshot_of(&[("ambient/desk", Some(desk)), ("heating/tank", Some(100.0))]);
        let verdict = gate(Component::Fan, want_on, false, &snap, &targets);
        let inside_on = want_on && desk > targets.target_room_temp - targets.deadband;
        let inside_off = !want_on && desk < targets.target_room_temp + targets.deadband;
        prop_assert_eq!(!verdict.is_apply(), inside_on || inside_off);
    }
}
