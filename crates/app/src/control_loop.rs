//! Control loop — the reconciler tying readings, decisions and actuators
//! together.
//!
//! Each tick:
//! 1. fetches the latest temperatures and the thermostat setpoint in one
//!    store query,
//! 2. skips actuation entirely when the desk or tank temperature is missing,
//! 3. runs the decision engine,
//! 4. gates every requested transition through the hysteresis check and
//!    commands the switches,
//! 5. re-polls every switch so drift is corrected,
//! 6. writes the tank setpoints back to the store.
//!
//! A failing tick is logged and the loop goes on; only the shutdown future
//! ends it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hearth_domain::component::{Component, PerComponent};
use hearth_domain::decision::{ControlDecision, Factor, decide};
use hearth_domain::error::HearthError;
use hearth_domain::hysteresis::{Gate, gate};
use hearth_domain::layout::{SiteLayout, metric};
use hearth_domain::reading::Reading;
use hearth_domain::snapshot::ReadingSnapshot;
use hearth_domain::targets::Targets;

use crate::actuator::{Acquire, ActuatorHandle, StatusRefresh, ToggleOutcome};
use crate::ports::{ReadingsStore, SwitchDiscovery};

/// Loop-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Pause between the end of one tick and the start of the next.
    pub tick_period: Duration,
    /// Configured targets; the room target is the fallback whenever the
    /// thermostat publishes nothing usable.
    pub targets: Targets,
    pub layout: SiteLayout,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(30),
            targets: Targets::default(),
            layout: SiteLayout::default(),
        }
    }
}

/// What happened to one component during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The engine asked for no change.
    NoChangeRequested,
    /// The switch is already believed to be in the requested state.
    AlreadySatisfied,
    /// The hysteresis gate held the current state.
    Suppressed(String),
    /// A command was issued to the handle.
    Commanded(ToggleOutcome),
}

/// Summary of one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    /// Critical readings were missing; nothing was actuated or written.
    Skipped { missing: Vec<String> },
    Completed {
        decision: ControlDecision,
        actions: PerComponent<Action>,
        refreshes: PerComponent<StatusRefresh>,
    },
}

/// The reconciler.
pub struct ControlLoop<D: SwitchDiscovery, R: ReadingsStore> {
    store: Arc<R>,
    settings: ControllerSettings,
    targets: Targets,
    handles: PerComponent<ActuatorHandle<D, R>>,
}

impl<D, R> ControlLoop<D, R>
where
    D: SwitchDiscovery,
    R: ReadingsStore,
{
    pub fn new(
        store: Arc<R>,
        settings: ControllerSettings,
        handles: PerComponent<ActuatorHandle<D, R>>,
    ) -> Self {
        Self {
            store,
            targets: settings.targets,
            settings,
            handles,
        }
    }

    /// Targets in effect, including the latest thermostat setpoint.
    #[must_use]
    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    #[must_use]
    pub fn handle(&self, component: Component) -> &ActuatorHandle<D, R> {
        self.handles.get(component)
    }

    /// Acquire every switch once. Switches that cannot be found are retried
    /// later through the handles' reconnect logic.
    pub async fn initialize(&mut self) -> PerComponent<Acquire> {
        let mut results = PerComponent::from_fn(|_| Acquire::NotFound);
        for component in Component::ALL {
            let handle = self.handles.get_mut(component);
            *results.get_mut(component) = handle.acquire().await;
            tracing::info!(
                %component,
                alias = handle.alias(),
                believed_on = ?handle.believed_on(),
                result = ?results.get(component),
                "initial switch state"
            );
        }
        results
    }

    /// Run one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns an error when the readings store cannot be queried. Device
    /// failures never surface here; they are reported in the [`TickReport`].
    pub async fn tick(&mut self) -> Result<TickReport, HearthError> {
        let layout = &self.settings.layout;
        let mut locations = layout.monitored_locations();
        if !locations.contains(&layout.thermostat.as_str()) {
            locations.push(layout.thermostat.as_str());
        }
        let metrics = [metric::TEMPERATURE, metric::TARGET_TEMP];
        let readings = self.store.get_current(&locations, &metrics).await?;

        self.targets =
            refresh_room_target(&readings, layout, &self.settings.targets, &self.targets);

        let snapshot = ReadingSnapshot::from_readings(&readings, layout);
        if !snapshot.missing().is_empty() {
            tracing::debug!(missing = ?snapshot.missing(), "readings missing");
        }
        if !snapshot.has_critical() {
            tracing::warn!(missing = ?snapshot.missing(), "missing critical readings, skipping actuation");
            return Ok(TickReport::Skipped {
                missing: snapshot.missing().to_vec(),
            });
        }

        let decision = decide(&snapshot, &self.targets);
        log_factor("need_room_heat", &decision.factors.need_room_heat);
        log_factor("can_heat_from_tank", &decision.factors.can_heat_from_tank);
        log_factor("need_tank_heat", &decision.factors.need_tank_heat);
        log_factor("pipe_freeze_risk", &decision.factors.pipe_freeze_risk);

        let mut actions = PerComponent::from_fn(|_| Action::NoChangeRequested);
        for component in Component::ALL {
            *actions.get_mut(component) = self.reconcile(component, &decision, &snapshot).await;
        }

        let mut refreshes =
            PerComponent::from_fn(|_| StatusRefresh::Unknown { reconnected: false });
        for component in Component::ALL {
            *refreshes.get_mut(component) = self.handles.get_mut(component).refresh_status().await;
        }

        self.write_tank_targets().await;

        Ok(TickReport::Completed {
            decision,
            actions,
            refreshes,
        })
    }

    /// Tick until `shutdown` resolves.
    ///
    /// Shutdown is observed between ticks; actuators are left in whatever
    /// state they are in.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        let mut shutdown = std::pin::pin!(shutdown);
        tracing::info!(tick_period = ?self.settings.tick_period, "control loop started");

        loop {
            match self.tick().await {
                Ok(TickReport::Skipped { .. }) => {}
                Ok(TickReport::Completed { actions, .. }) => {
                    for (component, action) in actions.iter() {
                        tracing::debug!(%component, ?action, "tick action");
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, source = ?std::error::Error::source(&err), "control loop tick failed");
                }
            }

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.settings.tick_period) => {}
            }
        }

        tracing::info!("control loop stopped");
    }

    async fn reconcile(
        &mut self,
        component: Component,
        decision: &ControlDecision,
        snapshot: &ReadingSnapshot,
    ) -> Action {
        let requested = decision.components.get(component);
        let Some(want_on) = requested.desired.as_bool() else {
            tracing::info!(%component, reason = %requested.reason, "no change requested");
            return Action::NoChangeRequested;
        };

        let handle = self.handles.get_mut(component);
        if handle.believed_on() == Some(want_on) {
            tracing::debug!(%component, want_on, reason = %requested.reason, "already in desired state");
            return Action::AlreadySatisfied;
        }

        match gate(
            component,
            want_on,
            requested.freeze_protection,
            snapshot,
            &self.targets,
        ) {
            Gate::Suppress(reason) => {
                tracing::info!(%component, want_on, %reason, "transition held by hysteresis");
                Action::Suppressed(reason)
            }
            Gate::Apply => {
                tracing::info!(%component, want_on, reason = %requested.reason, "commanding switch");
                let outcome = if want_on {
                    handle.turn_on().await
                } else {
                    handle.turn_off().await
                };
                Action::Commanded(outcome)
            }
        }
    }

    async fn write_tank_targets(&self) {
        let tank = &self.settings.layout.tank;
        let readings: Result<Vec<Reading>, HearthError> = [
            (metric::TARGET_TEMP_TANK, self.targets.target_tank_temp),
            (metric::CRITICAL_TEMP_TANK, self.targets.critical_tank_temp()),
        ]
        .into_iter()
        .map(|(name, value)| {
            Reading::builder()
                .location(tank)
                .metric(name)
                .numeric(value)
                .build()
        })
        .collect();

        let result = match readings {
            Ok(readings) => self.store.put(readings).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to write tank targets");
        }
    }
}

/// Room target for this tick: the thermostat setpoint when it publishes a
/// usable one, the configured target otherwise.
fn refresh_room_target(
    readings: &[Reading],
    layout: &SiteLayout,
    configured: &Targets,
    current: &Targets,
) -> Targets {
    let setpoint = readings
        .iter()
        .filter(|r| r.location == layout.thermostat && r.metric == metric::TARGET_TEMP)
        .max_by_key(|r| r.timestamp);

    let target = match setpoint {
        Some(reading) => match reading.as_f64() {
            Some(value) => Some(value),
            None => {
                if reading.is_valid() {
                    tracing::warn!(value = %reading.value, "unparseable thermostat setpoint, using configured target");
                }
                None
            }
        },
        None => None,
    };

    let room = target.unwrap_or(configured.target_room_temp);
    if (room - current.target_room_temp).abs() > f64::EPSILON {
        if target.is_some() {
            tracing::info!(from = current.target_room_temp, to = room, "room target updated from thermostat");
        } else {
            tracing::info!(to = room, "no thermostat setpoint, using configured room target");
        }
    }
    current.with_room_target(room)
}

fn log_factor(name: &str, factor: &Factor) {
    tracing::info!(factor = name, value = ?factor.value, reason = %factor.reason, "heating factor");
}
