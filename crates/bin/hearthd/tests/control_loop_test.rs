//! End-to-end tests for the full hearthd stack.
//!
//! Each test wires the real control loop to an in-memory `SQLite` readings
//! store and virtual switches, seeds sensor readings the way collectors
//! would, and checks what the switches and the store see afterwards.

use std::sync::Arc;
use std::time::Duration;

use hearth_adapter_storage_sqlite_sqlx::{Config, SqliteReadingsStore};
use hearth_adapter_virtual::VirtualPlugs;
use hearth_app::actuator::{ActuatorHandle, ActuatorSettings, StatusRefresh, ToggleOutcome};
use hearth_app::control_loop::{Action, ControlLoop, ControllerSettings, TickReport};
use hearth_app::ports::ReadingsStore;
use hearth_domain::component::{Component, PerComponent};
use hearth_domain::reading::Reading;

struct Harness {
    control: ControlLoop<VirtualPlugs, SqliteReadingsStore>,
    store: Arc<SqliteReadingsStore>,
    plugs: Arc<VirtualPlugs>,
}

fn alias(component: Component) -> &'static str {
    match component {
        Component::Pump => "Pump",
        Component::Heater => "Heater",
        Component::Fan => "Fan",
    }
}

fn settings() -> ActuatorSettings {
    ActuatorSettings {
        command_timeout: Duration::from_millis(200),
        discovery_timeout: Duration::from_millis(200),
        discovery_attempts: 1,
        ..ActuatorSettings::default()
    }
}

/// Build a fully-wired control loop backed by an in-memory `SQLite` database.
async fn harness() -> Harness {
    harness_with(&Component::ALL.map(alias)).await
}

/// Same as [`harness`], with only the given aliases discoverable.
async fn harness_with(aliases: &[&str]) -> Harness {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let store = Arc::new(SqliteReadingsStore::new(db.pool().clone()));
    let plugs = Arc::new(VirtualPlugs::with_aliases(aliases.iter().copied()));

    let handles = PerComponent::from_fn(|component| {
        ActuatorHandle::new(
            component,
            alias(component),
            format!("heating/{component}"),
            Arc::clone(&plugs),
            Arc::clone(&store),
            settings(),
        )
    });
    let mut control = ControlLoop::new(
        Arc::clone(&store),
        ControllerSettings::default(),
        handles,
    );
    control.initialize().await;

    Harness {
        control,
        store,
        plugs,
    }
}

async fn seed(store: &SqliteReadingsStore, values: &[(&str, f64)]) {
    let readings = values
        .iter()
        .map(|(location, value)| {
            Reading::builder()
                .source_type("onewire")
                .sensor_id(format!("28-{location}"))
                .location(*location)
                .metric("temperature_f")
                .numeric(*value)
                .build()
                .unwrap()
        })
        .collect();
    store.put(readings).await.unwrap();
}

async fn current_value(
    store: &SqliteReadingsStore,
    location: &str,
    metric: &str,
) -> Option<String> {
    store
        .get_current(&[location], &[metric])
        .await
        .unwrap()
        .into_iter()
        .next()
        .map(|reading| reading.value)
}

async fn completed(
    control: &mut ControlLoop<VirtualPlugs, SqliteReadingsStore>,
) -> (PerComponent<Action>, PerComponent<StatusRefresh>) {
    match control.tick().await.unwrap() {
        TickReport::Completed {
            actions, refreshes, ..
        } => (actions, refreshes),
        TickReport::Skipped { missing } => panic!("tick skipped, missing {missing:?}"),
    }
}

// ---------------------------------------------------------------------------
// Heating
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_switch_pump_and_record_telemetry_when_room_is_cold() {
    let mut h = harness().await;
    seed(
        &h.store,
        &[
            ("ambient/desk", 38.0),
            ("heating/tank", 135.0),
            ("heating/floor", 45.0),
        ],
    )
    .await;

    let (actions, _) = completed(&mut h.control).await;

    assert_eq!(actions.pump, Action::Commanded(ToggleOutcome::Toggled));
    assert_eq!(actions.heater, Action::Commanded(ToggleOutcome::Toggled));
    assert!(h.plugs.get("Pump").unwrap().is_on_now());
    assert!(h.plugs.get("Heater").unwrap().is_on_now());
    assert_eq!(
        current_value(&h.store, "heating/pump", "control_state_pump").await,
        Some("on".to_string())
    );
    assert_eq!(
        current_value(&h.store, "heating/tank", "target_temp_tank").await,
        Some("140".to_string())
    );
    assert_eq!(
        current_value(&h.store, "heating/tank", "critical_temp_f_tank").await,
        Some("40".to_string())
    );
}

#[tokio::test]
async fn should_follow_thermostat_setpoint_from_store() {
    let mut h = harness().await;
    seed(&h.store, &[("ambient/desk", 50.0), ("heating/tank", 141.0)]).await;
    let setpoint = Reading::builder()
        .source_type("thermostat")
        .sensor_id("thermostat_shed")
        .location("shed")
        .metric("target_temp_f")
        .numeric(65.0)
        .build()
        .unwrap();
    h.store.put(vec![setpoint]).await.unwrap();

    let (actions, _) = completed(&mut h.control).await;

    assert!((h.control.targets().target_room_temp - 65.0).abs() < f64::EPSILON);
    assert_eq!(actions.pump, Action::Commanded(ToggleOutcome::Toggled));
}

// ---------------------------------------------------------------------------
// Missing data
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_not_touch_anything_when_all_readings_are_absent() {
    let mut h = harness().await;

    let report = h.control.tick().await.unwrap();

    assert!(matches!(report, TickReport::Skipped { .. }));
    for component in Component::ALL {
        assert_eq!(h.plugs.get(alias(component)).unwrap().toggles(), 0);
    }
    assert_eq!(
        current_value(&h.store, "heating/tank", "target_temp_tank").await,
        None
    );
}

#[tokio::test]
async fn should_skip_freeze_prevention_when_desk_missing() {
    let mut h = harness().await;
    seed(&h.store, &[("heating/tank", 141.0), ("heating/pre-tank", 33.0)]).await;

    // the desk is critical: nothing runs, not even freeze prevention
    let report = h.control.tick().await.unwrap();
    assert!(matches!(
        report,
        TickReport::Skipped { ref missing } if missing.contains(&"ambient/desk".to_string())
    ));
    assert!(!h.plugs.get("Pump").unwrap().is_on_now());
}

// ---------------------------------------------------------------------------
// Device faults
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_keep_ticking_when_switch_refuses_commands() {
    let mut h = harness().await;
    h.plugs.get("Pump").unwrap().set_failing(true);
    seed(&h.store, &[("ambient/desk", 38.0), ("heating/tank", 141.0)]).await;

    let (actions, _) = completed(&mut h.control).await;
    assert_eq!(actions.pump, Action::Commanded(ToggleOutcome::Failed));
    assert_eq!(h.control.handle(Component::Pump).believed_on(), Some(false));

    // the failed attempt still counts against the cooldown
    h.plugs.get("Pump").unwrap().set_failing(false);
    let (actions, _) = completed(&mut h.control).await;
    assert!(matches!(
        actions.pump,
        Action::Commanded(ToggleOutcome::Deferred { .. })
    ));
    assert!(!h.plugs.get("Pump").unwrap().is_on_now());
}

#[tokio::test]
async fn should_bound_hung_switch_by_command_timeout() {
    let mut h = harness().await;
    h.plugs
        .get("Pump")
        .unwrap()
        .set_latency(Duration::from_secs(5));
    seed(&h.store, &[("ambient/desk", 38.0), ("heating/tank", 141.0)]).await;

    let started = std::time::Instant::now();
    let (actions, refreshes) = completed(&mut h.control).await;

    assert_eq!(actions.pump, Action::Commanded(ToggleOutcome::Failed));
    assert!(matches!(refreshes.pump, StatusRefresh::Failed { .. }));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn should_correct_state_changed_outside_the_controller() {
    let mut h = harness().await;
    seed(&h.store, &[("ambient/desk", 45.0), ("heating/tank", 141.0)]).await;
    h.plugs.get("Fan").unwrap().press();

    let (_, refreshes) = completed(&mut h.control).await;

    assert_eq!(
        refreshes.fan,
        StatusRefresh::Corrected {
            from: Some(false),
            to: true
        }
    );
    assert_eq!(h.control.handle(Component::Fan).believed_on(), Some(true));
}

#[tokio::test]
async fn should_keep_acquired_switch_after_it_leaves_discovery() {
    let mut h = harness().await;
    h.plugs.remove("Heater");
    seed(&h.store, &[("ambient/desk", 38.0), ("heating/tank", 120.0)]).await;

    let (actions, _) = completed(&mut h.control).await;

    assert_eq!(actions.heater, Action::Commanded(ToggleOutcome::Toggled));
}

#[tokio::test]
async fn should_report_unavailable_switch_without_failing_tick() {
    let mut h = harness_with(&["Pump", "Heater"]).await;
    seed(
        &h.store,
        &[
            ("ambient/desk", 38.0),
            ("heating/tank", 141.0),
            ("heating/floor", 50.0),
        ],
    )
    .await;

    let (actions, refreshes) = completed(&mut h.control).await;

    assert_eq!(actions.fan, Action::Commanded(ToggleOutcome::Unavailable));
    assert_eq!(refreshes.fan, StatusRefresh::Failed { reconnected: false });
    assert_eq!(actions.pump, Action::Commanded(ToggleOutcome::Toggled));
}
