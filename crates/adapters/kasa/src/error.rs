//! Kasa adapter error types.

use hearth_domain::error::HearthError;

/// Errors specific to the Kasa adapter.
#[derive(Debug, thiserror::Error)]
pub enum KasaError {
    /// Socket-level failure.
    #[error("I/O error talking to plug")]
    Io(#[from] std::io::Error),

    /// The decrypted payload was not the expected JSON.
    #[error("malformed plug response")]
    Json(#[from] serde_json::Error),

    /// A response frame announced an implausible length.
    #[error("response frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),

    /// The plug answered with a non-zero error code.
    #[error("plug rejected request with code {code}: {message}")]
    Device {
        /// `err_code` from the response.
        code: i64,
        /// `err_msg` from the response, if any.
        message: String,
    },

    /// A pinned host could not be resolved.
    #[error("cannot resolve host {0:?}")]
    UnresolvedHost(String),
}

impl From<KasaError> for HearthError {
    fn from(err: KasaError) -> Self {
        Self::Actuator(Box::new(err))
    }
}
