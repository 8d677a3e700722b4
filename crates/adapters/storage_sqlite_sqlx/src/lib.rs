//! # hearth-adapter-storage-sqlite-sqlx
//!
//! `SQLite` readings store using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `ReadingsStore` port defined in `hearth-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain readings and database rows
//!
//! ## Dependency rule
//! Depends on `hearth-app` (for port traits) and `hearth-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod readings_store;

pub use pool::{Config, Database};
pub use readings_store::SqliteReadingsStore;
