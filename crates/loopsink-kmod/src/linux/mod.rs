//! Linux module-subsystem backend.
//!
//! Queries module init-state from `/sys/module`, resolves aliases and
//! dependencies with `modprobe --show-depends`, and inserts module objects
//! with `insmod`. Install rules are executed through the shell, the same way
//! the module tooling itself runs them.

use std::path::{Path, PathBuf};
use std::process::Command;

use loopsink_types::{ModuleCandidate, ModuleState, ProbeAction};
use tracing::{debug, warn};

use crate::error::KmodError;
use crate::ModuleSubsystem;

/// Module subsystem backed by sysfs and the modprobe tooling.
pub struct ModprobeSubsystem {
    sysfs_root: PathBuf,
}

impl Default for ModprobeSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ModprobeSubsystem {
    pub fn new() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/module"),
        }
    }

    /// Backend with an alternate sysfs module root (used by tests).
    pub fn with_sysfs_root(root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: root.into(),
        }
    }

    fn state_from_sysfs(&self, name: &str) -> ModuleState {
        let dir = self.sysfs_root.join(normalize_name(name));
        match std::fs::read_to_string(dir.join("initstate")) {
            Ok(state) => match state.trim() {
                "live" => ModuleState::Live,
                // "coming" (and the short-lived "going") are not usable yet.
                _ => ModuleState::Staged,
            },
            // Built-in modules expose a parameter directory but no initstate.
            Err(_) if dir.is_dir() => ModuleState::BuiltIn,
            Err(_) => ModuleState::Absent,
        }
    }
}

impl ModuleSubsystem for ModprobeSubsystem {
    fn module_state(&mut self, name: &str) -> ModuleState {
        let state = self.state_from_sysfs(name);
        debug!(module = name, %state, "queried module state");
        state
    }

    fn lookup(&mut self, name: &str) -> Result<Vec<ModuleCandidate>, KmodError> {
        let output = Command::new("modprobe")
            .arg("--show-depends")
            .arg("--")
            .arg(name)
            .output()
            .map_err(|e| KmodError::Lookup(format!("failed to run modprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KmodError::Lookup(format!(
                "modprobe --show-depends {name}: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_show_depends(name, &stdout))
    }

    fn probe_insert(
        &mut self,
        candidate: &ModuleCandidate,
        options: &str,
        log: &mut dyn FnMut(&ProbeAction),
    ) -> i32 {
        if let Some(command) = &candidate.install_command {
            log(&ProbeAction::Install {
                command: command.clone(),
                options: options.to_string(),
            });
            return run_status(Command::new("sh").arg("-c").arg(command));
        }

        let Some(path) = &candidate.path else {
            log(&ProbeAction::Builtin {
                name: candidate.name.clone(),
            });
            return 0;
        };

        // Ignore-if-loaded: an already resident candidate counts as inserted.
        if self.state_from_sysfs(&candidate.name).is_resident() {
            return 0;
        }

        log(&ProbeAction::Insert {
            path: path.clone(),
            options: options.to_string(),
        });
        run_status(Command::new("insmod").arg(path).arg(options))
    }
}

fn run_status(command: &mut Command) -> i32 {
    match command.status() {
        Ok(status) => status.code().unwrap_or(-1),
        Err(e) => {
            warn!(error = %e, "failed to spawn module tooling");
            -1
        }
    }
}

/// Kernel module names use underscores where aliases may carry dashes.
fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Parse `modprobe --show-depends` output into ordered insertion candidates.
///
/// Lines are one of:
/// - `insmod /path/to/dep.ko [options]`
/// - `install /bin/sh -c "..."`
/// - `builtin name`
fn parse_show_depends(requested: &str, stdout: &str) -> Vec<ModuleCandidate> {
    let mut candidates = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("insmod ") {
            let path = rest.split_whitespace().next().unwrap_or(rest);
            let name = Path::new(path)
                .file_name()
                .and_then(|f| f.to_str())
                .map_or_else(|| requested.to_string(), |f| {
                    normalize_name(f.split('.').next().unwrap_or(f))
                });
            candidates.push(ModuleCandidate::from_path(name, path));
        } else if let Some(command) = line.strip_prefix("install ") {
            candidates.push(ModuleCandidate {
                name: normalize_name(requested),
                path: None,
                install_command: Some(command.to_string()),
            });
        } else if let Some(name) = line.strip_prefix("builtin ") {
            candidates.push(ModuleCandidate::builtin(normalize_name(name.trim())));
        }
    }
    candidates
}
