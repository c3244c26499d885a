//! Daemon errors.

use loopsink_bus::BusError;
use loopsink_kmod::KmodError;
use loopsink_types::CallError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("module subsystem error: {0}")]
    Kmod(#[from] KmodError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure to make the module resident, surfaced to the caller as a
/// structured bus error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The dependency lookup failed or resolved to nothing.
    #[error("ERROR: not found module {0}")]
    NotFound(String),

    /// One or more candidate insertions returned a nonzero code. Which one
    /// failed is not preserved.
    #[error("ERROR: load module failed: {0}")]
    InsertionFailed(String),
}

impl LoadError {
    /// The wire representation: domain-tagged, code 1, message naming the
    /// module.
    pub fn to_call_error(&self, domain: &str) -> CallError {
        CallError {
            domain: domain.to_string(),
            code: 1,
            message: self.to_string(),
        }
    }
}
