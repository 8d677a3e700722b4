//! # hearth-adapter-kasa
//!
//! TP-Link Kasa smart plug adapter.
//!
//! ## How it works
//!
//! Kasa plugs speak JSON over port 9999, obfuscated with a one-byte
//! autokey XOR cipher (see [`protocol`]):
//!
//! | Transport | Framing | Used for |
//! |-----------|---------|----------|
//! | UDP broadcast | none | discovery (`get_sysinfo` to everyone, match on `alias`) |
//! | TCP | 4-byte big-endian length prefix | `set_relay_state`, `get_sysinfo` |
//!
//! Plugs can also be pinned to a fixed host in [`KasaConfig::hosts`] when
//! broadcast does not reach them.
//!
//! Calls are not bounded here; the actuator handle in `hearth-app` wraps
//! each one in a timeout.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `hearth-app` and `hearth-domain`.

mod client;
mod config;
mod discovery;
mod error;
pub mod protocol;

pub use client::KasaPlug;
pub use config::KasaConfig;
pub use discovery::KasaDiscovery;
pub use error::KasaError;
