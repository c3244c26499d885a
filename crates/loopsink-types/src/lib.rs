//! Shared types for loopsink.
//!
//! This crate contains the types shared across the loopsink workspace:
//! kernel-module init states and probe candidates, the bus request/response
//! messages, and the well-known service identity constants.

pub mod message;
pub mod module;
pub mod service;

pub use message::{CallError, Request, Response};
pub use module::{ModuleCandidate, ModuleState, ProbeAction};
pub use service::{
    card_label_param, DEFAULT_CARD_LABEL, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MODULE_NAME,
    METHOD_LOAD_MODULE, PROP_MODULE_IN_KERNEL, WELL_KNOWN_NAME,
};
