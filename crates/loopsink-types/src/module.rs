//! Kernel-module states and probe candidates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Init-state of a kernel module as reported by the module subsystem.
///
/// Re-queried on every check; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// Not loaded, and the name does not resolve to anything.
    Absent,
    /// Staged for load but not yet initialized.
    Staged,
    /// Loaded and initialized.
    Live,
    /// Compiled directly into the kernel.
    BuiltIn,
}

impl ModuleState {
    /// Whether the module is usable right now (loaded or built in).
    pub fn is_resident(self) -> bool {
        matches!(self, Self::Live | Self::BuiltIn)
    }
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Staged => write!(f, "staged"),
            Self::Live => write!(f, "live"),
            Self::BuiltIn => write!(f, "builtin"),
        }
    }
}

/// One module file/alias returned by a dependency lookup.
///
/// A logical module name may expand to several candidates (dependencies,
/// install rules, the module itself); each gets its own insertion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCandidate {
    /// Canonical module name.
    pub name: String,
    /// Filesystem path of the module object, if it has one.
    pub path: Option<PathBuf>,
    /// Install command for modules loaded via an install rule.
    pub install_command: Option<String>,
}

impl ModuleCandidate {
    /// Candidate backed by a module object on disk.
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            install_command: None,
        }
    }

    /// Candidate with neither a path nor an install rule (built-in).
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            install_command: None,
        }
    }
}

/// What a probe-insert attempt did with one candidate.
///
/// Reported once per candidate through the loader's log callback; purely
/// observational and never affects control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeAction {
    /// The candidate is loaded by running an install command.
    Install { command: String, options: String },
    /// The candidate is built into the kernel; nothing to insert.
    Builtin { name: String },
    /// The candidate is inserted from a module object.
    Insert { path: PathBuf, options: String },
}

impl std::fmt::Display for ProbeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install { command, options } => write!(f, "install {command} {options}"),
            Self::Builtin { name } => write!(f, "builtin {name}"),
            Self::Insert { path, options } => write!(f, "insmod {} {options}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residency() {
        assert!(ModuleState::Live.is_resident());
        assert!(ModuleState::BuiltIn.is_resident());
        assert!(!ModuleState::Staged.is_resident());
        assert!(!ModuleState::Absent.is_resident());
    }

    #[test]
    fn probe_action_display() {
        let action = ProbeAction::Insert {
            path: PathBuf::from("/lib/modules/v4l2loopback.ko"),
            options: "card_label=\"OBS-Camera\"".to_string(),
        };
        assert_eq!(
            action.to_string(),
            "insmod /lib/modules/v4l2loopback.ko card_label=\"OBS-Camera\""
        );
    }
}
