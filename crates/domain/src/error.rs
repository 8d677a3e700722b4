//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`HearthError`] via `From` when crossing a port boundary.

use std::time::Duration;

/// Boxed source error carried across port boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Base error type shared by every crate in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A looked-up item does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The readings store failed.
    #[error("storage error")]
    Storage(#[source] BoxError),

    /// A physical switch (or its driver) failed.
    #[error("actuator error")]
    Actuator(#[source] BoxError),

    /// A bounded operation did not complete in time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A required text field was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A temperature or threshold was NaN or infinite.
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    /// The deadband was negative.
    #[error("deadband must not be negative, got {0}")]
    NegativeDeadband(f64),
}

/// A lookup that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of the missing item (e.g. `"Switch"`).
    pub entity: &'static str,
    /// Identifier used for the lookup.
    pub id: String,
}
