//! `SQLite` implementation of [`ReadingsStore`].
//!
//! Every write appends to `sensor_readings` and upserts `current_readings`
//! in the same transaction. Reads only touch `current_readings`.

use std::collections::BTreeMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};

use hearth_app::ports::ReadingsStore;
use hearth_domain::error::HearthError;
use hearth_domain::reading::{MetricType, Reading};
use hearth_domain::time::{from_storage_string, now, to_storage_string};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Wrapper(Reading);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let timestamp: String = row.try_get("timestamp")?;
        let metric_type: String = row.try_get("metric_type")?;

        let timestamp =
            from_storage_string(&timestamp).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let metric_type: MetricType = metric_type
            .parse()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Reading {
            timestamp,
            source_type: row.try_get("source_type")?,
            sensor_id: row.try_get("sensor_id")?,
            location: row.try_get("location")?,
            metric: row.try_get("metric")?,
            metric_type,
            value: row.try_get("value")?,
        }))
    }
}

const INSERT_HISTORY: &str = r"
    INSERT INTO sensor_readings (timestamp, source_type, sensor_id, location, metric, metric_type, value)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";

const UPSERT_CURRENT: &str = r"
    INSERT INTO current_readings (sensor_id, location, metric, metric_type, value, timestamp, source_type, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (sensor_id, location, metric) DO UPDATE SET
        metric_type = excluded.metric_type,
        value = excluded.value,
        timestamp = excluded.timestamp,
        source_type = excluded.source_type,
        updated_at = excluded.updated_at
";

const SELECT_CURRENT: &str = r"
    SELECT timestamp, source_type, sensor_id, location, metric, metric_type, value
    FROM current_readings
    WHERE location IN (";

/// `SQLite`-backed readings store.
pub struct SqliteReadingsStore {
    pool: SqlitePool,
}

impl SqliteReadingsStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ReadingsStore for SqliteReadingsStore {
    async fn get_current(
        &self,
        locations: &[&str],
        metrics: &[&str],
    ) -> Result<Vec<Reading>, HearthError> {
        if locations.is_empty() || metrics.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(SELECT_CURRENT);
        {
            let mut in_list = query.separated(", ");
            for location in locations {
                in_list.push_bind(*location);
            }
        }
        query.push(") AND metric IN (");
        {
            let mut in_list = query.separated(", ");
            for metric in metrics {
                in_list.push_bind(*metric);
            }
        }
        query.push(")");

        let rows: Vec<Wrapper> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        // several sensors may report the same location and metric
        let mut newest: BTreeMap<(String, String), Reading> = BTreeMap::new();
        for Wrapper(reading) in rows {
            let key = (reading.location.clone(), reading.metric.clone());
            match newest.get(&key) {
                Some(existing) if existing.timestamp >= reading.timestamp => {}
                _ => {
                    newest.insert(key, reading);
                }
            }
        }

        Ok(newest.into_values().collect())
    }

    async fn put(&self, readings: Vec<Reading>) -> Result<(), HearthError> {
        if readings.is_empty() {
            return Ok(());
        }

        let updated_at = to_storage_string(now());
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        for reading in &readings {
            let timestamp = to_storage_string(reading.timestamp);
            let metric_type = reading.metric_type.to_string();

            sqlx::query(INSERT_HISTORY)
                .bind(&timestamp)
                .bind(&reading.source_type)
                .bind(&reading.sensor_id)
                .bind(&reading.location)
                .bind(&reading.metric)
                .bind(&metric_type)
                .bind(&reading.value)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;

            sqlx::query(UPSERT_CURRENT)
                .bind(&reading.sensor_id)
                .bind(&reading.location)
                .bind(&reading.metric)
                .bind(&metric_type)
                .bind(&reading.value)
                .bind(&timestamp)
                .bind(&reading.source_type)
                .bind(&updated_at)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        tx.commit().await.map_err(StorageError::from)?;
        tracing::debug!(count = readings.len(), "readings stored");
        Ok(())
    }
}
