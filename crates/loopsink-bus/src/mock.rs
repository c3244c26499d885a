//! Mock bus transport for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use loopsink_types::Response;
use tokio::sync::{mpsc, oneshot};

use crate::error::BusError;
use crate::transport::{BusEvent, BusTransport};

#[derive(Default)]
struct MockBusState {
    refuse_name: bool,
    fail_export: bool,
    exported: bool,
    name_owned: bool,
    module_in_kernel: bool,
    property_history: Vec<bool>,
    unexports: usize,
    releases: usize,
    events: Option<mpsc::Sender<BusEvent>>,
}

/// Scripted bus transport.
///
/// By default the name is acquired immediately and export succeeds. Tests
/// use the [`MockBusHandle`] to refuse the name, fail export, inject method
/// calls, or drop the name mid-run.
pub struct MockBus {
    state: Arc<Mutex<MockBusState>>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockBusState::default())),
        }
    }

    /// Get a clonable handle for scripting and observing the transport.
    pub fn handle(&self) -> MockBusHandle {
        MockBusHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable scripting/observer handle for [`MockBus`].
#[derive(Clone)]
pub struct MockBusHandle {
    state: Arc<Mutex<MockBusState>>,
}

impl MockBusHandle {
    /// Make name acquisition fail (lost to a competitor).
    pub fn refuse_name(&self) {
        self.state.lock().unwrap().refuse_name = true;
    }

    /// Make the export step fail.
    pub fn fail_export(&self) {
        self.state.lock().unwrap().fail_export = true;
    }

    /// Whether the interface is currently exported.
    pub fn is_exported(&self) -> bool {
        self.state.lock().unwrap().exported
    }

    /// Current value of the published property.
    pub fn module_in_kernel(&self) -> bool {
        self.state.lock().unwrap().module_in_kernel
    }

    /// Every value the property was ever set to, in order.
    pub fn property_history(&self) -> Vec<bool> {
        self.state.lock().unwrap().property_history.clone()
    }

    /// How many times `unexport` ran against an exported interface.
    pub fn unexport_count(&self) -> usize {
        self.state.lock().unwrap().unexports
    }

    /// How many times `release_name` ran against an owned name.
    pub fn release_count(&self) -> usize {
        self.state.lock().unwrap().releases
    }

    fn events(&self) -> Option<mpsc::Sender<BusEvent>> {
        self.state.lock().unwrap().events.clone()
    }

    /// Inject a method call and wait for the daemon's reply.
    pub async fn call(&self, method: &str) -> Response {
        let events = self.events().expect("transport not started");
        let (reply_tx, reply_rx) = oneshot::channel();
        events
            .send(BusEvent::Call {
                method: method.to_string(),
                reply: reply_tx,
            })
            .await
            .expect("daemon loop gone");
        reply_rx.await.expect("call abandoned")
    }

    /// Drop the name out from under the daemon.
    pub async fn lose_name(&self) {
        let events = self.events().expect("transport not started");
        let _ = events.send(BusEvent::NameLost).await;
    }
}

#[async_trait]
impl BusTransport for MockBus {
    async fn own_name(&mut self, events: mpsc::Sender<BusEvent>) -> Result<(), BusError> {
        let (tx, refused) = {
            let mut state = self.state.lock().unwrap();
            state.events = Some(events.clone());
            state.name_owned = !state.refuse_name;
            (events, state.refuse_name)
        };
        let event = if refused {
            BusEvent::NameLost
        } else {
            BusEvent::NameAcquired
        };
        let _ = tx.send(event).await;
        Ok(())
    }

    async fn export(&mut self) -> Result<(), BusError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_export {
            return Err(BusError::Export("scripted export failure".to_string()));
        }
        state.exported = true;
        Ok(())
    }

    fn set_module_in_kernel(&mut self, value: bool) {
        let mut state = self.state.lock().unwrap();
        state.module_in_kernel = value;
        state.property_history.push(value);
    }

    fn module_in_kernel(&self) -> bool {
        self.state.lock().unwrap().module_in_kernel
    }

    async fn unexport(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.exported {
            state.exported = false;
            state.unexports += 1;
        }
    }

    async fn release_name(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.name_owned {
            state.name_owned = false;
            state.releases += 1;
        }
        state.events = None;
    }
}
