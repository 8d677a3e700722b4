//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `hearth.toml` in the working directory (or the path in
//! `HEARTH_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use hearth_adapter_kasa::KasaConfig;
use hearth_app::actuator::{ActuatorSettings, Cooldown};
use hearth_app::control_loop::ControllerSettings;
use hearth_domain::component::{Component, PerComponent};
use hearth_domain::layout::SiteLayout;
use hearth_domain::targets::Targets;

const DEFAULT_PATH: &str = "hearth.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Loop period and targets.
    pub controller: ControllerConfig,
    /// Which location plays which role.
    pub layout: SiteLayout,
    /// Switch driver and per-component devices.
    pub actuators: ActuatorsConfig,
    /// Kasa driver settings.
    pub kasa: KasaConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Control loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seconds between ticks.
    pub tick_secs: u64,
    /// Room target used when the thermostat publishes nothing.
    pub target_room_temp: f64,
    pub target_tank_temp: f64,
    pub freeze_prevention_temp: f64,
    pub deadband: f64,
}

/// Which switch implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Kasa,
    Virtual,
}

/// Switch settings shared by every component, plus the per-component devices.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActuatorsConfig {
    pub driver: Driver,
    pub command_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    pub discovery_attempts: u32,
    pub discovery_backoff_secs: u64,
    /// Seconds without a status update before a reconnect is attempted.
    pub staleness_secs: u64,
    pub pump: DeviceConfig,
    pub heater: DeviceConfig,
    pub fan: DeviceConfig,
}

/// One physical switch.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name the switch is discovered by.
    pub alias: String,
    /// Where toggle telemetry is recorded.
    pub location: String,
    pub cooldown_on_secs: Option<u64>,
    pub cooldown_off_secs: Option<u64>,
}

impl Config {
    /// Load configuration from `hearth.toml` (or `HEARTH_CONFIG`), then
    /// apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HEARTH_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HEARTH_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("HEARTH_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(secs) = var("HEARTH_TICK_SECS").and_then(|val| val.parse().ok()) {
            self.controller.tick_secs = secs;
        }
        match var("HEARTH_ACTUATOR_DRIVER").as_deref() {
            Some("kasa") => self.actuators.driver = Driver::Kasa,
            Some("virtual") => self.actuators.driver = Driver::Virtual,
            _ => {}
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.tick_secs == 0 {
            return Err(ConfigError::Validation(
                "controller.tick_secs must be non-zero".to_string(),
            ));
        }
        self.targets()
            .validate()
            .map_err(|err| ConfigError::Validation(format!("controller: {err}")))?;
        self.layout
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        for (name, secs) in [
            ("command_timeout_secs", self.actuators.command_timeout_secs),
            ("discovery_timeout_secs", self.actuators.discovery_timeout_secs),
            ("staleness_secs", self.actuators.staleness_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Validation(format!(
                    "actuators.{name} must be non-zero"
                )));
            }
        }
        if self.actuators.discovery_attempts == 0 {
            return Err(ConfigError::Validation(
                "actuators.discovery_attempts must be at least 1".to_string(),
            ));
        }
        for component in Component::ALL {
            let device = self.device(component);
            if device.alias.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "actuators.{component}.alias must not be empty"
                )));
            }
            if device.location.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "actuators.{component}.location must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn targets(&self) -> Targets {
        Targets {
            target_room_temp: self.controller.target_room_temp,
            target_tank_temp: self.controller.target_tank_temp,
            freeze_prevention_temp: self.controller.freeze_prevention_temp,
            deadband: self.controller.deadband,
        }
    }

    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            tick_period: Duration::from_secs(self.controller.tick_secs),
            targets: self.targets(),
            layout: self.layout.clone(),
        }
    }

    #[must_use]
    pub fn device(&self, component: Component) -> &DeviceConfig {
        match component {
            Component::Pump => &self.actuators.pump,
            Component::Heater => &self.actuators.heater,
            Component::Fan => &self.actuators.fan,
        }
    }

    #[must_use]
    pub fn actuator_settings(&self) -> PerComponent<ActuatorSettings> {
        let actuators = &self.actuators;
        let defaults = Cooldown::default();
        PerComponent::from_fn(|component| {
            let device = self.device(component);
            ActuatorSettings {
                cooldown: Cooldown {
                    on: device
                        .cooldown_on_secs
                        .map_or(defaults.on, Duration::from_secs),
                    off: device
                        .cooldown_off_secs
                        .map_or(defaults.off, Duration::from_secs),
                },
                command_timeout: Duration::from_secs(actuators.command_timeout_secs),
                discovery_timeout: Duration::from_secs(actuators.discovery_timeout_secs),
                discovery_attempts: actuators.discovery_attempts,
                discovery_backoff: Duration::from_secs(actuators.discovery_backoff_secs),
                staleness: Duration::from_secs(actuators.staleness_secs),
            }
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:hearth.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hearthd=info,hearth=info".to_string(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let targets = Targets::default();
        Self {
            tick_secs: 30,
            target_room_temp: targets.target_room_temp,
            target_tank_temp: targets.target_tank_temp,
            freeze_prevention_temp: targets.freeze_prevention_temp,
            deadband: targets.deadband,
        }
    }
}

impl Default for ActuatorsConfig {
    fn default() -> Self {
        let settings = ActuatorSettings::default();
        Self {
            driver: Driver::Kasa,
            command_timeout_secs: settings.command_timeout.as_secs(),
            discovery_timeout_secs: settings.discovery_timeout.as_secs(),
            discovery_attempts: settings.discovery_attempts,
            discovery_backoff_secs: settings.discovery_backoff.as_secs(),
            staleness_secs: settings.staleness.as_secs(),
            pump: DeviceConfig::named("Pump", "heating/pump"),
            heater: DeviceConfig::named("Heater", "heating/heater"),
            fan: DeviceConfig::named("Fan", "heating/fan"),
        }
    }
}

impl DeviceConfig {
    fn named(alias: &str, location: &str) -> Self {
        Self {
            alias: alias.to_string(),
            location: location.to_string(),
            ..Self::default()
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
