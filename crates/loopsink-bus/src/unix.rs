//! Unix domain socket bus backend.
//!
//! The well-known name maps to a socket path under the runtime directory.
//! Owning the name means holding the bound listener: if the socket already
//! accepts connections another owner is alive and the name is reported lost;
//! a socket file nobody answers on is stale and gets reclaimed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use loopsink_types::{CallError, Request, Response, PROP_MODULE_IN_KERNEL};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::BusError;
use crate::transport::{BusEvent, BusTransport};
use crate::wire;

/// Default directory for bus sockets.
pub fn default_socket_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
}

/// The socket path a well-known name maps to inside `dir`.
pub fn socket_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.sock"))
}

/// Bus transport over a Unix domain socket.
pub struct UnixBus {
    name: String,
    path: PathBuf,
    property: watch::Sender<bool>,
    events: Option<mpsc::Sender<BusEvent>>,
    listener: Option<UnixListener>,
    accept_task: Option<JoinHandle<()>>,
    owned: bool,
}

impl UnixBus {
    /// Transport for `name`, with its socket under `socket_dir`.
    pub fn new(name: &str, socket_dir: &Path) -> Self {
        let (property, _) = watch::channel(false);
        Self {
            name: name.to_string(),
            path: socket_path(socket_dir, name),
            property,
            events: None,
            listener: None,
            accept_task: None,
            owned: false,
        }
    }

    /// The socket path this transport binds.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BusTransport for UnixBus {
    async fn own_name(&mut self, events: mpsc::Sender<BusEvent>) -> Result<(), BusError> {
        self.events = Some(events.clone());

        if self.path.exists() {
            if UnixStream::connect(&self.path).await.is_ok() {
                warn!(name = %self.name, "bus name already owned");
                let _ = events.send(BusEvent::NameLost).await;
                return Ok(());
            }
            // Nobody answers: a previous owner died without cleanup.
            debug!(path = %self.path.display(), "removing stale socket");
            std::fs::remove_file(&self.path)?;
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&self.path)
            .map_err(|e| BusError::Connection(format!("failed to bind {}: {e}", self.path.display())))?;

        info!(name = %self.name, path = %self.path.display(), "bus name acquired");
        self.listener = Some(listener);
        self.owned = true;
        let _ = events.send(BusEvent::NameAcquired).await;
        Ok(())
    }

    async fn export(&mut self) -> Result<(), BusError> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| BusError::Export("bus name not acquired".to_string()))?;
        let events = self
            .events
            .clone()
            .ok_or_else(|| BusError::Export("transport not started".to_string()))?;

        let name = self.name.clone();
        let property = self.property.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        debug!("accepted bus connection");
                        tokio::spawn(handle_connection(
                            stream,
                            name.clone(),
                            events.clone(),
                            property.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "bus accept failed");
                        let _ = events.send(BusEvent::NameLost).await;
                        break;
                    }
                }
            }
        });

        self.accept_task = Some(task);
        debug!(name = %self.name, "interface exported");
        Ok(())
    }

    fn set_module_in_kernel(&mut self, value: bool) {
        self.property.send_replace(value);
    }

    fn module_in_kernel(&self) -> bool {
        *self.property.borrow()
    }

    async fn unexport(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
            debug!(name = %self.name, "interface unexported");
        }
    }

    async fn release_name(&mut self) {
        if self.owned {
            self.owned = false;
            if let Err(e) = std::fs::remove_file(&self.path) {
                debug!(error = %e, "failed to remove bus socket");
            }
            info!(name = %self.name, "bus name released");
        }
        self.listener = None;
        self.events = None;
    }
}

/// Serve one client connection until it hangs up.
async fn handle_connection(
    mut stream: UnixStream,
    name: String,
    events: mpsc::Sender<BusEvent>,
    property: watch::Receiver<bool>,
) {
    loop {
        let request: Request = match wire::read_frame(&mut stream).await {
            Ok(request) => request,
            Err(BusError::StreamClosed) => break,
            Err(e) => {
                debug!(error = %e, "malformed bus request");
                break;
            }
        };

        let response = match request {
            Request::Call { method } => {
                let (reply_tx, reply_rx) = oneshot::channel();
                if events
                    .send(BusEvent::Call {
                        method,
                        reply: reply_tx,
                    })
                    .await
                    .is_err()
                {
                    // Daemon loop is gone; nothing sensible to reply.
                    break;
                }
                match reply_rx.await {
                    Ok(response) => response,
                    Err(_) => break,
                }
            }
            Request::GetProperty { name: prop } if prop == PROP_MODULE_IN_KERNEL => {
                Response::Property {
                    value: *property.borrow(),
                }
            }
            Request::GetProperty { name: prop } => Response::Error(CallError {
                domain: name.clone(),
                code: 2,
                message: format!("unknown property {prop}"),
            }),
        };

        if let Err(e) = wire::write_frame(&mut stream, &response).await {
            debug!(error = %e, "failed to write bus response");
            break;
        }
    }
}
