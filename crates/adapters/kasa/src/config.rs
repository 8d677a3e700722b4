//! Kasa adapter configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Configuration for Kasa discovery and control.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KasaConfig {
    /// Address discovery probes are sent to.
    pub broadcast_address: String,
    /// Device port, for both UDP discovery and TCP control.
    pub port: u16,
    /// How long to collect discovery answers, in milliseconds.
    pub discovery_window_ms: u64,
    /// Aliases pinned to a host (IP or name), skipping broadcast discovery.
    pub hosts: BTreeMap<String, String>,
}

impl Default for KasaConfig {
    fn default() -> Self {
        Self {
            broadcast_address: "255.255.255.255".to_string(),
            port: 9999,
            discovery_window_ms: 3000,
            hosts: BTreeMap::new(),
        }
    }
}
