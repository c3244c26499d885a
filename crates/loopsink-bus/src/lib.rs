//! Local bus transport and wire protocol for loopsink.
//!
//! This crate models the inter-process bus the daemon sits on: a
//! [`BusTransport`] with own-name/export/lose-name semantics delivering
//! [`BusEvent`]s to the daemon's run loop, a Unix domain socket backend
//! whose socket path is derived from the well-known name, and a
//! [`BusClient`] for callers. Frames are length-prefixed bincode v2.

pub mod client;
pub mod error;
pub mod transport;
pub mod unix;
pub mod wire;

#[cfg(feature = "mock")]
pub mod mock;

pub use client::BusClient;
pub use error::BusError;
pub use transport::{BusEvent, BusTransport};
pub use unix::UnixBus;
