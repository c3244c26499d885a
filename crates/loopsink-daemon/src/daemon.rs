//! Core daemon orchestration.
//!
//! One daemon instance owns the module-subsystem handle, the bus transport,
//! and the idle timer, and dispatches all events on a single cooperative
//! run loop: bus name acquisition/loss, method invocations, the shutdown
//! control channel, and the idle deadline, one at a time. Module queries
//! and load attempts run inline on the loop task.

use std::time::Duration;

use loopsink_bus::{BusEvent, BusTransport};
use loopsink_kmod::ModuleSubsystem;
use loopsink_types::{card_label_param, CallError, Response, METHOD_LOAD_MODULE};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{DaemonError, LoadError};
use crate::timer::IdleTimer;

/// Control events fed into the daemon's run loop from outside the bus.
#[derive(Debug)]
pub enum DaemonEvent {
    /// Terminate the run loop and tear down.
    Shutdown,
}

/// The loopsink daemon.
pub struct Daemon {
    config: Config,
    modules: Box<dyn ModuleSubsystem>,
    bus: Box<dyn BusTransport>,
    idle: IdleTimer,
    bus_tx: mpsc::Sender<BusEvent>,
    bus_rx: mpsc::Receiver<BusEvent>,
    ctl_tx: mpsc::Sender<DaemonEvent>,
    ctl_rx: mpsc::Receiver<DaemonEvent>,
}

impl Daemon {
    /// Create a daemon instance.
    ///
    /// Eagerly probes the module once so a client reading the property
    /// before the first call still sees an accurate snapshot.
    pub fn new(
        config: Config,
        modules: Box<dyn ModuleSubsystem>,
        bus: Box<dyn BusTransport>,
    ) -> Self {
        let (bus_tx, bus_rx) = mpsc::channel(64);
        let (ctl_tx, ctl_rx) = mpsc::channel(8);
        let idle = IdleTimer::new(
            Duration::from_secs(config.daemon.idle_timeout_secs),
            config.daemon.no_timeout,
        );

        let mut daemon = Self {
            config,
            modules,
            bus,
            idle,
            bus_tx,
            bus_rx,
            ctl_tx,
            ctl_rx,
        };

        let resident = daemon.module_resident();
        daemon.bus.set_module_in_kernel(resident);
        daemon
    }

    /// Get a sender for feeding control events into the run loop.
    pub fn control_sender(&self) -> mpsc::Sender<DaemonEvent> {
        self.ctl_tx.clone()
    }

    /// Run the daemon until idle timeout, name loss, export failure, or a
    /// shutdown event, then tear down.
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        self.bus.own_name(self.bus_tx.clone()).await?;
        info!(name = %self.config.bus.name, module = %self.config.module.name, "daemon running");

        loop {
            let deadline = self.idle.deadline();
            tokio::select! {
                event = self.bus_rx.recv() => match event {
                    Some(BusEvent::NameAcquired) => {
                        if let Err(e) = self.bus.export().await {
                            error!(error = %e, "failed to export interface");
                            break;
                        }
                        debug!("interface exported");
                    }
                    Some(BusEvent::NameLost) => {
                        info!("bus name lost");
                        break;
                    }
                    Some(BusEvent::Call { method, reply }) => {
                        self.handle_call(&method, reply);
                    }
                    None => break,
                },
                event = self.ctl_rx.recv() => match event {
                    Some(DaemonEvent::Shutdown) | None => {
                        info!("shutting down");
                        break;
                    }
                },
                () = sleep_until_opt(deadline), if deadline.is_some() => {
                    info!("idle timeout reached");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    fn handle_call(&mut self, method: &str, reply: oneshot::Sender<Response>) {
        let response = if method == METHOD_LOAD_MODULE {
            self.load_module_call()
        } else {
            warn!(method, "unknown method");
            Response::Error(CallError {
                domain: self.config.bus.name.clone(),
                code: 2,
                message: format!("unknown method {method}"),
            })
        };
        // The connection may be gone; that only abandons this reply.
        let _ = reply.send(response);
    }

    /// The `LoadModule` method: already resident replies success without
    /// invoking the loader; otherwise load and report.
    fn load_module_call(&mut self) -> Response {
        if self.module_resident() {
            debug!(module = %self.config.module.name, "module already resident");
            return Response::Return { success: true };
        }

        match self.load_module() {
            Ok(()) => {
                self.bus.set_module_in_kernel(true);
                Response::Return { success: true }
            }
            Err(e) => {
                warn!(error = %e, "load failed");
                Response::Error(e.to_call_error(&self.config.bus.name))
            }
        }
    }

    /// Query the module's residency. The prober doubles as a liveness touch:
    /// it runs on every call and at startup, so it resets the idle timer.
    fn module_resident(&mut self) -> bool {
        self.idle.reset();
        self.modules
            .module_state(&self.config.module.name)
            .is_resident()
    }

    /// Resolve the module through a dependency lookup and insert every
    /// candidate, aggregating the result codes.
    fn load_module(&mut self) -> Result<(), LoadError> {
        self.idle.reset();
        let module = self.config.module.name.clone();

        let candidates = match self.modules.lookup(&module) {
            Ok(candidates) if !candidates.is_empty() => candidates,
            Ok(_) => return Err(LoadError::NotFound(module)),
            Err(e) => {
                debug!(error = %e, "lookup failed");
                return Err(LoadError::NotFound(module));
            }
        };

        let options = card_label_param(&self.config.module.card_label);
        let mut result = 0;
        for candidate in &candidates {
            result += self.modules.probe_insert(candidate, &options, &mut |action| {
                debug!(%action, "probe");
            });
            debug!(module = %candidate.name, total = result, "modprobe result");
        }

        if result == 0 {
            Ok(())
        } else {
            Err(LoadError::InsertionFailed(module))
        }
    }

    /// Tear down in reverse acquisition order. Every step is guarded by the
    /// transport/timer, so running this again (or on a daemon whose bus was
    /// never acquired) is harmless.
    pub async fn shutdown(&mut self) {
        self.bus.unexport().await;
        self.bus.release_name().await;
        self.idle.cancel();
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    // Only polled when a deadline is armed; see the select! guard.
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
