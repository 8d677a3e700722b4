//! Targets — setpoints and thresholds for the decision engine.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Setpoints and thresholds, in °F.
///
/// Loaded once at startup. Only the room target changes at runtime, when
/// the thermostat publishes a new setpoint (see [`with_room_target`](Self::with_room_target)).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targets {
    /// Desired desk (room) temperature.
    pub target_room_temp: f64,
    /// Desired tank temperature while the room wants heat.
    pub target_tank_temp: f64,
    /// Below this, pipes and tank are at risk and get heated regardless.
    pub freeze_prevention_temp: f64,
    /// Hysteresis width around thresholds.
    pub deadband: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            target_room_temp: 40.0,
            target_tank_temp: 140.0,
            freeze_prevention_temp: 40.0,
            deadband: 1.0,
        }
    }
}

impl Targets {
    /// The minimum temperature the tank may reach; equal to the freeze
    /// prevention temperature.
    #[must_use]
    pub fn critical_tank_temp(&self) -> f64 {
        self.freeze_prevention_temp
    }

    /// Copy of these targets with a different room setpoint.
    #[must_use]
    pub fn with_room_target(self, target_room_temp: f64) -> Self {
        Self {
            target_room_temp,
            ..self
        }
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotFinite`] for NaN/infinite values and
    /// [`ValidationError::NegativeDeadband`] for a negative deadband.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("target_room_temp", self.target_room_temp),
            ("target_tank_temp", self.target_tank_temp),
            ("freeze_prevention_temp", self.freeze_prevention_temp),
            ("deadband", self.deadband),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ValidationError::NotFinite(name));
            }
        }
        if self.deadband < 0.0 {
            return Err(ValidationError::NegativeDeadband(self.deadband));
        }
        Ok(())
    }
}
