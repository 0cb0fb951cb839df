//! Error taxonomy for the focus-monitoring core.
//!
//! Missing sensor data never appears here: the extractor recovers it locally
//! by falling back to default signals.

use thiserror::Error;

use crate::timer::SessionState;

/// Failure reported by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Failure reported by the emotion classifier collaborator.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier did not answer within {0} ms")]
    Timeout(u64),

    #[error("classifier failed: {0}")]
    Failed(String),
}

/// Failure of a session accountant operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {op} while session is {from:?}")]
    InvalidTransition { from: SessionState, op: &'static str },

    #[error("planned duration must be greater than zero")]
    InvalidDuration,

    #[error("failed to save session: {0}")]
    Storage(#[from] StorageError),
}
