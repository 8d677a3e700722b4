//! Readings store port — latest values in, telemetry out.

use std::future::Future;

use hearth_domain::error::HearthError;
use hearth_domain::reading::Reading;

/// Store of sensor and controller readings.
pub trait ReadingsStore: Send + Sync {
    /// Most recent reading per `(location, metric)` pair among the given
    /// locations and metrics.
    ///
    /// Pairs with no reading are simply absent from the result.
    fn get_current(
        &self,
        locations: &[&str],
        metrics: &[&str],
    ) -> impl Future<Output = Result<Vec<Reading>, HearthError>> + Send;

    /// Persist a batch of readings.
    ///
    /// Best effort: callers log a failure and carry on.
    fn put(&self, readings: Vec<Reading>) -> impl Future<Output = Result<(), HearthError>> + Send;
}
