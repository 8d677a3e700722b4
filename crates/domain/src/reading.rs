//! Reading — an immutable record of one metric observed at one location.
//!
//! Values are carried as text so that numeric and state metrics share one
//! shape. Numeric values are parsed on demand; a value that does not parse
//! is treated as *absent*, never as zero.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HearthError, ValidationError};
use crate::time::{Timestamp, now};

/// Source type used for everything the controller writes itself.
pub const SOURCE_CONTROLLER: &str = "controller";

/// How a reading's value should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Numeric,
    State,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => f.write_str("numeric"),
            Self::State => f.write_str("state"),
        }
    }
}

/// Error returned when parsing an unknown [`MetricType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric type {0:?}")]
pub struct UnknownMetricType(pub String);

impl FromStr for MetricType {
    type Err = UnknownMetricType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numeric" => Ok(Self::Numeric),
            "state" => Ok(Self::State),
            other => Err(UnknownMetricType(other.to_string())),
        }
    }
}

/// A single sensor or controller reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: Timestamp,
    pub source_type: String,
    pub sensor_id: String,
    /// Composite `"{system}/{place}"` key, or a legacy bare name.
    pub location: String,
    pub metric: String,
    pub metric_type: MetricType,
    pub value: String,
}

impl Reading {
    /// Create a builder for constructing a [`Reading`].
    #[must_use]
    pub fn builder() -> ReadingBuilder {
        ReadingBuilder::default()
    }

    /// Whether the value is present at all (not empty and not `null`).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let value = self.value.trim();
        !value.is_empty() && !value.eq_ignore_ascii_case("null")
    }

    /// Parse the value as a finite number.
    ///
    /// Returns `None` for `null`, empty, unparseable and non-finite values.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        if !self.is_valid() {
            return None;
        }
        self.value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }
}

/// Deterministic sensor id for readings emitted by the controller itself.
#[must_use]
pub fn controller_sensor_id(location: &str) -> String {
    format!("{SOURCE_CONTROLLER}_{location}")
}

/// Step-by-step builder for [`Reading`].
#[derive(Debug)]
pub struct ReadingBuilder {
    timestamp: Option<Timestamp>,
    source_type: String,
    sensor_id: Option<String>,
    location: String,
    metric: String,
    metric_type: MetricType,
    value: String,
}

impl Default for ReadingBuilder {
    fn default() -> Self {
        Self {
            timestamp: None,
            source_type: SOURCE_CONTROLLER.to_string(),
            sensor_id: None,
            location: String::new(),
            metric: String::new(),
            metric_type: MetricType::Numeric,
            value: String::new(),
        }
    }
}

impl ReadingBuilder {
    #[must_use]
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    #[must_use]
    pub fn sensor_id(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    #[must_use]
    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    /// Set a numeric value, rendered with its shortest exact representation.
    #[must_use]
    pub fn numeric(mut self, value: f64) -> Self {
        self.metric_type = MetricType::Numeric;
        self.value = value.to_string();
        self
    }

    /// Set a state value (e.g. `on`/`off`).
    #[must_use]
    pub fn state(mut self, value: impl Into<String>) -> Self {
        self.metric_type = MetricType::State;
        self.value = value.into();
        self
    }

    /// Set a raw value with an explicit type, as read back from storage.
    #[must_use]
    pub fn raw(mut self, metric_type: MetricType, value: impl Into<String>) -> Self {
        self.metric_type = metric_type;
        self.value = value.into();
        self
    }

    /// Build the reading.
    ///
    /// When no sensor id was given, the controller id for the location is
    /// used; when no timestamp was given, the current time is used.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if `location`, `metric` or
    /// `source_type` is empty.
    pub fn build(self) -> Result<Reading, HearthError> {
        if self.location.trim().is_empty() {
            return Err(ValidationError::Empty("location").into());
        }
        if self.metric.trim().is_empty() {
            return Err(ValidationError::Empty("metric").into());
        }
        if self.source_type.trim().is_empty() {
            return Err(ValidationError::Empty("source_type").into());
        }

        let sensor_id = self
            .sensor_id
            .unwrap_or_else(|| controller_sensor_id(&self.location));

        Ok(Reading {
            timestamp: self.timestamp.unwrap_or_else(now),
            source_type: self.source_type,
            sensor_id,
            location: self.location,
            metric: self.metric,
            metric_type: self.metric_type,
            value: self.value,
        })
    }
}
