//! Mock module subsystem for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use loopsink_types::{ModuleCandidate, ModuleState, ProbeAction};

use crate::error::KmodError;
use crate::ModuleSubsystem;

/// A recorded probe-insert attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    pub name: String,
    pub options: String,
}

#[derive(Debug, Default)]
struct MockState {
    states: HashMap<String, ModuleState>,
    candidates: Vec<ModuleCandidate>,
    lookup_error: Option<String>,
    insert_codes: HashMap<String, i32>,
    probes: Vec<ProbeRecord>,
    lookups: usize,
    state_queries: usize,
}

/// Scripted module subsystem.
///
/// Tests set module states, lookup candidates, and per-candidate insertion
/// result codes through the [`MockSubsystemHandle`], then observe what the
/// daemon did with them.
pub struct MockSubsystem {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSubsystem {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Get a clonable handle for scripting and observing the subsystem.
    pub fn handle(&self) -> MockSubsystemHandle {
        MockSubsystemHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable scripting/observer handle for [`MockSubsystem`].
#[derive(Clone)]
pub struct MockSubsystemHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockSubsystemHandle {
    /// Script the init-state reported for a module name.
    pub fn set_state(&self, name: &str, state: ModuleState) {
        self.state.lock().unwrap().states.insert(name.to_string(), state);
    }

    /// Script the candidates returned by dependency lookup.
    pub fn set_candidates(&self, candidates: Vec<ModuleCandidate>) {
        self.state.lock().unwrap().candidates = candidates;
    }

    /// Make dependency lookup itself fail.
    pub fn fail_lookup(&self, message: &str) {
        self.state.lock().unwrap().lookup_error = Some(message.to_string());
    }

    /// Script the result code of inserting the named candidate (default 0).
    pub fn set_insert_code(&self, name: &str, code: i32) {
        self.state.lock().unwrap().insert_codes.insert(name.to_string(), code);
    }

    /// All probe-insert attempts observed so far.
    pub fn probes(&self) -> Vec<ProbeRecord> {
        self.state.lock().unwrap().probes.clone()
    }

    /// Number of dependency lookups performed.
    pub fn lookup_count(&self) -> usize {
        self.state.lock().unwrap().lookups
    }

    /// Number of init-state queries performed.
    pub fn state_query_count(&self) -> usize {
        self.state.lock().unwrap().state_queries
    }
}

impl ModuleSubsystem for MockSubsystem {
    fn module_state(&mut self, name: &str) -> ModuleState {
        let mut state = self.state.lock().unwrap();
        state.state_queries += 1;
        state
            .states
            .get(name)
            .copied()
            .unwrap_or(ModuleState::Absent)
    }

    fn lookup(&mut self, _name: &str) -> Result<Vec<ModuleCandidate>, KmodError> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        if let Some(message) = &state.lookup_error {
            return Err(KmodError::Lookup(message.clone()));
        }
        Ok(state.candidates.clone())
    }

    fn probe_insert(
        &mut self,
        candidate: &ModuleCandidate,
        options: &str,
        log: &mut dyn FnMut(&ProbeAction),
    ) -> i32 {
        let action = if let Some(command) = &candidate.install_command {
            ProbeAction::Install {
                command: command.clone(),
                options: options.to_string(),
            }
        } else if let Some(path) = &candidate.path {
            ProbeAction::Insert {
                path: path.clone(),
                options: options.to_string(),
            }
        } else {
            ProbeAction::Builtin {
                name: candidate.name.clone(),
            }
        };
        log(&action);

        let mut state = self.state.lock().unwrap();
        state.probes.push(ProbeRecord {
            name: candidate.name.clone(),
            options: options.to_string(),
        });
        let code = state
            .insert_codes
            .get(&candidate.name)
            .copied()
            .unwrap_or(0);
        if code == 0 {
            state
                .states
                .insert(candidate.name.clone(), ModuleState::Live);
        }
        code
    }
}
