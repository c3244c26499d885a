//! Bus client for callers of the service.

use std::path::Path;

use loopsink_types::{Request, Response, METHOD_LOAD_MODULE, PROP_MODULE_IN_KERNEL};
use tokio::net::UnixStream;

use crate::error::BusError;
use crate::wire;

/// A connection to the loopsink service.
pub struct BusClient {
    stream: UnixStream,
}

impl BusClient {
    /// Connect to the service socket.
    pub async fn connect(path: &Path) -> Result<Self, BusError> {
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| BusError::Connection(format!("{}: {e}", path.display())))?;
        Ok(Self { stream })
    }

    /// Invoke a method by name and return its boolean output argument.
    ///
    /// A structured error reply surfaces as [`BusError::Call`].
    pub async fn call(&mut self, method: &str) -> Result<bool, BusError> {
        wire::write_frame(
            &mut self.stream,
            &Request::Call {
                method: method.to_string(),
            },
        )
        .await?;
        match wire::read_frame(&mut self.stream).await? {
            Response::Return { success } => Ok(success),
            Response::Error(e) => Err(BusError::Call(e)),
            Response::Property { .. } => Err(BusError::Deserialization(
                "property reply to a method call".to_string(),
            )),
        }
    }

    /// Ask the service to ensure the module is loaded.
    pub async fn load_module(&mut self) -> Result<bool, BusError> {
        self.call(METHOD_LOAD_MODULE).await
    }

    /// Read the module-in-kernel property.
    pub async fn module_in_kernel(&mut self) -> Result<bool, BusError> {
        wire::write_frame(
            &mut self.stream,
            &Request::GetProperty {
                name: PROP_MODULE_IN_KERNEL.to_string(),
            },
        )
        .await?;
        match wire::read_frame(&mut self.stream).await? {
            Response::Property { value } => Ok(value),
            Response::Error(e) => Err(BusError::Call(e)),
            Response::Return { .. } => Err(BusError::Deserialization(
                "method reply to a property read".to_string(),
            )),
        }
    }
}
