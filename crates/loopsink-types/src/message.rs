//! Bus message types.
//!
//! Requests and responses exchanged between loopsink clients and the daemon
//! over the local bus socket.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A request from a client to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Request {
    /// Invoke a method on the service interface.
    Call {
        /// Method name, e.g. `LoadModule`.
        method: String,
    },
    /// Read one of the service's exposed properties.
    GetProperty {
        /// Property name, e.g. `ModuleInKernel`.
        name: String,
    },
}

/// A reply from the service to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Response {
    /// Successful method return.
    Return {
        /// The method's single boolean output argument.
        success: bool,
    },
    /// Structured method error.
    Error(CallError),
    /// Property value.
    Property {
        /// Current value of the requested property.
        value: bool,
    },
}

/// A domain-tagged error reply, mirroring a bus error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct CallError {
    /// Error domain; the service uses its well-known bus name.
    pub domain: String,
    /// Numeric error code within the domain.
    pub code: u32,
    /// Human-readable message.
    pub message: String,
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} code {})", self.message, self.domain, self.code)
    }
}

impl std::error::Error for CallError {}
