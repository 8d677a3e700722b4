//! Site layout — which monitored location plays which role, and the metric
//! names the controller reads and writes.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Metric names shared with the sensor collectors and downstream consumers.
pub mod metric {
    /// Temperature readings, in °F.
    pub const TEMPERATURE: &str = "temperature_f";
    /// Room setpoint published by the thermostat, in °F.
    pub const TARGET_TEMP: &str = "target_temp_f";
    /// Tank setpoint written back by the controller.
    pub const TARGET_TEMP_TANK: &str = "target_temp_tank";
    /// Minimum allowed tank temperature written back by the controller.
    pub const CRITICAL_TEMP_TANK: &str = "critical_temp_f_tank";

    /// Metric recording a switch toggle for one component.
    #[must_use]
    pub fn control_state(component: crate::component::Component) -> String {
        format!("control_state_{component}")
    }
}

/// Default locations, following the `{system}/{place}` convention.
pub mod location {
    pub const TANK: &str = "heating/tank";
    pub const DESK: &str = "ambient/desk";
    pub const FLOOR: &str = "heating/floor";
    pub const HEATER_INPUT: &str = "heating/heater-input";
    pub const HEATER_OUTPUT: &str = "heating/heater-output";
    pub const PRE_TANK: &str = "heating/pre-tank";
    /// Legacy bare name under which the thermostat publishes its setpoint.
    pub const THERMOSTAT: &str = "shed";
}

/// Mapping from roles to concrete location keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteLayout {
    /// Hot-water storage tank.
    pub tank: String,
    /// Comfort sensor near the desk; the room temperature.
    pub desk: String,
    /// Floor loop; also a pipe segment.
    pub floor: String,
    /// Where the thermostat setpoint is published.
    pub thermostat: String,
    /// Pipe segments watched for freeze risk, in priority order.
    pub pipes: Vec<String>,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            tank: location::TANK.to_string(),
            desk: location::DESK.to_string(),
            floor: location::FLOOR.to_string(),
            thermostat: location::THERMOSTAT.to_string(),
            pipes: vec![
                location::HEATER_INPUT.to_string(),
                location::FLOOR.to_string(),
                location::HEATER_OUTPUT.to_string(),
                location::PRE_TANK.to_string(),
            ],
        }
    }
}

impl SiteLayout {
    /// Every location whose temperature feeds the decision engine,
    /// deduplicated, pipes first.
    #[must_use]
    pub fn monitored_locations(&self) -> Vec<&str> {
        let mut locations: Vec<&str> = Vec::new();
        let candidates = self
            .pipes
            .iter()
            .map(String::as_str)
            .chain([self.floor.as_str(), self.tank.as_str(), self.desk.as_str()]);
        for loc in candidates {
            if !locations.contains(&loc) {
                locations.push(loc);
            }
        }
        locations
    }

    /// Check that no role is left unmapped.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] naming the first empty role.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let roles = [
            ("layout.tank", &self.tank),
            ("layout.desk", &self.desk),
            ("layout.floor", &self.floor),
            ("layout.thermostat", &self.thermostat),
        ];
        for (name, value) in roles {
            if value.trim().is_empty() {
                return Err(ValidationError::Empty(name));
            }
        }
        if self.pipes.iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError::Empty("layout.pipes"));
        }
        Ok(())
    }
}
