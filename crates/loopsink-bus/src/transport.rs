//! The bus transport seam.
//!
//! The daemon sees the bus as an opaque RPC channel: it asks a transport to
//! own the well-known name, exports its interface once the name is acquired,
//! and reacts to the events the transport feeds into its run loop.

use async_trait::async_trait;
use loopsink_types::Response;
use tokio::sync::{mpsc, oneshot};

use crate::error::BusError;

/// Events a transport delivers to the daemon's run loop.
pub enum BusEvent {
    /// The well-known name was acquired; the daemon should export.
    NameAcquired,
    /// The name was lost (taken by a competitor or the bus went away).
    NameLost,
    /// An inbound method invocation awaiting a reply.
    Call {
        /// Requested method name.
        method: String,
        /// Channel the handler replies on; dropping it abandons the call.
        reply: oneshot::Sender<Response>,
    },
}

/// A connection to the inter-process bus.
///
/// All operations are idempotent where the teardown path needs them to be:
/// [`unexport`](Self::unexport) and [`release_name`](Self::release_name) are
/// safe to call repeatedly or on a transport that never acquired the name.
#[async_trait]
pub trait BusTransport: Send + 'static {
    /// Request ownership of the well-known name. Acquisition and loss are
    /// reported through `events`, not the return value; an error here means
    /// the bus itself is unreachable.
    async fn own_name(&mut self, events: mpsc::Sender<BusEvent>) -> Result<(), BusError>;

    /// Export the service interface, making method calls deliverable.
    /// Only valid after the name was acquired.
    async fn export(&mut self) -> Result<(), BusError>;

    /// Publish the module-in-kernel property value.
    fn set_module_in_kernel(&mut self, value: bool);

    /// Current published value of the module-in-kernel property.
    fn module_in_kernel(&self) -> bool;

    /// Withdraw the exported interface.
    async fn unexport(&mut self);

    /// Give up the well-known name.
    async fn release_name(&mut self);
}
