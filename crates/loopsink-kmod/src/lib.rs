//! Module-subsystem capability for loopsink.
//!
//! This crate defines the [`ModuleSubsystem`] trait the daemon uses to talk
//! to the OS's loadable-kernel-module facility. The Linux backend (feature
//! `linux`) probes `/sys/module` and drives `modprobe`/`insmod`; the mock
//! backend (feature `mock`) scripts module tables for tests.
//!
//! All operations are synchronous and expected to be fast local calls; the
//! daemon invokes them inline on its loop task.

use loopsink_types::{ModuleCandidate, ModuleState, ProbeAction};

pub mod error;

#[cfg(feature = "linux")]
pub mod linux;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::KmodError;

/// A session with the OS's loadable-kernel-module management facility.
pub trait ModuleSubsystem: Send + 'static {
    /// Init-state of the module with exactly this name.
    ///
    /// A name that cannot be resolved at all reports [`ModuleState::Absent`];
    /// resolution failure is a definitive not-resident, not an error.
    fn module_state(&mut self, name: &str) -> ModuleState;

    /// Alias/dependency lookup: the ordered candidates whose insertion makes
    /// `name` resident.
    ///
    /// An empty candidate list means the name is unknown to the subsystem.
    fn lookup(&mut self, name: &str) -> Result<Vec<ModuleCandidate>, KmodError>;

    /// Attempt to insert one candidate, skipping candidates that are already
    /// loaded. `options` is a single free-form parameter string.
    ///
    /// `log` is invoked once with the action taken; it must not affect the
    /// outcome. Returns the raw result code, zero on success.
    fn probe_insert(
        &mut self,
        candidate: &ModuleCandidate,
        options: &str,
        log: &mut dyn FnMut(&ProbeAction),
    ) -> i32;
}
