//! Core daemon for loopsink.
//!
//! Implements the idle-timeout lifecycle state machine, the module
//! presence-check/load sequence, and the bus facade that ties them to the
//! transport's name/export events.

pub mod config;
pub mod daemon;
pub mod error;
pub mod setup;
pub mod timer;

pub use config::Config;
pub use daemon::{Daemon, DaemonEvent};
pub use error::{DaemonError, LoadError};
pub use timer::IdleTimer;
