//! Module-subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KmodError {
    #[error("module lookup failed: {0}")]
    Lookup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
