// ── Core error types ──
//
// Per-field transport failures never reach this type: they are recorded in
// the snapshot. `CoreError` only covers what a caller has to act on.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The first refresh produced no usable field at all. The caller should
    /// abort setup and retry later rather than run degraded.
    #[error("Server not ready: {reason}")]
    NotReady { reason: String },

    /// A failure outside the modeled taxonomy aborted a refresh cycle.
    #[error("Refresh of '{field}' failed unexpectedly: {source}")]
    Unexpected {
        field: String,
        #[source]
        source: shelfwatch_api::Error,
    },

    /// Direct (non-cycle) API call failed.
    #[error(transparent)]
    Api(#[from] shelfwatch_api::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The coordinator was shut down while the call was in flight.
    #[error("Coordinator shut down")]
    Shutdown,
}

impl CoreError {
    /// Returns `true` if retrying later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotReady { .. } => true,
            Self::Api(e) => e.is_transient(),
            _ => false,
        }
    }
}
