//! Reading snapshot — the consistent view of temperatures for one tick.
//!
//! Built once per control-loop tick from a single store query. Every
//! decision made during that tick reads from the same snapshot.

use std::collections::BTreeMap;

use crate::layout::{SiteLayout, metric};
use crate::reading::Reading;

/// Latest usable temperature per monitored location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingSnapshot {
    desk: Option<f64>,
    tank: Option<f64>,
    floor: Option<f64>,
    pipes: Vec<(String, f64)>,
    missing: Vec<String>,
}

impl ReadingSnapshot {
    /// Build a snapshot from the readings returned by the store.
    ///
    /// Only `temperature_f` readings at monitored locations are considered.
    /// Readings whose value does not parse are dropped (and the location is
    /// reported as missing). If the store returned several readings for one
    /// location, the newest wins.
    #[must_use]
    pub fn from_readings<'a>(
        readings: impl IntoIterator<Item = &'a Reading>,
        layout: &SiteLayout,
    ) -> Self {
        let monitored = layout.monitored_locations();
        let mut newest: BTreeMap<&str, &Reading> = BTreeMap::new();

        for reading in readings {
            if reading.metric != metric::TEMPERATURE {
                continue;
            }
            let Some(&loc) = monitored.iter().find(|loc| **loc == reading.location) else {
                continue;
            };
            if reading.as_f64().is_none() {
                continue;
            }
            match newest.get(loc) {
                Some(existing) if existing.timestamp >= reading.timestamp => {}
                _ => {
                    newest.insert(loc, reading);
                }
            }
        }

        let values: BTreeMap<String, f64> = newest
            .into_iter()
            .filter_map(|(loc, r)| r.as_f64().map(|v| (loc.to_string(), v)))
            .collect();

        Self::from_values(values, layout)
    }

    /// Build a snapshot from already-parsed values keyed by location.
    #[must_use]
    pub fn from_values(values: BTreeMap<String, f64>, layout: &SiteLayout) -> Self {
        let get = |loc: &str| values.get(loc).copied();
        let pipes = layout
            .pipes
            .iter()
            .filter_map(|loc| get(loc).map(|v| (loc.clone(), v)))
            .collect();
        let missing = layout
            .monitored_locations()
            .into_iter()
            .filter(|loc| !values.contains_key(*loc))
            .map(str::to_string)
            .collect();

        Self {
            desk: get(&layout.desk),
            tank: get(&layout.tank),
            floor: get(&layout.floor),
            pipes,
            missing,
        }
    }

    /// Room temperature at the desk sensor.
    #[must_use]
    pub fn desk(&self) -> Option<f64> {
        self.desk
    }

    /// Tank water temperature.
    #[must_use]
    pub fn tank(&self) -> Option<f64> {
        self.tank
    }

    /// Floor loop temperature.
    #[must_use]
    pub fn floor(&self) -> Option<f64> {
        self.floor
    }

    /// Known pipe-segment temperatures, in layout order.
    #[must_use]
    pub fn pipes(&self) -> &[(String, f64)] {
        &self.pipes
    }

    /// Monitored locations that had no usable reading.
    #[must_use]
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Whether both the desk and the tank temperatures are known.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.desk.is_some() && self.tank.is_some()
    }
}
