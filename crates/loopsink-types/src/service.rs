//! Well-known service identity.
//!
//! Names and defaults shared by the daemon and its clients. The bus name
//! and module identity match the service this daemon exists to manage, so
//! existing callers keep working.

/// Well-known bus name the daemon owns.
pub const WELL_KNOWN_NAME: &str = "com.obsproject.v4l2sink";

/// The one method exposed on the service interface.
pub const METHOD_LOAD_MODULE: &str = "LoadModule";

/// The one read-visible property exposed on the service interface.
pub const PROP_MODULE_IN_KERNEL: &str = "ModuleInKernel";

/// The kernel module this service manages.
pub const DEFAULT_MODULE_NAME: &str = "v4l2loopback";

/// Device label passed to the module on insertion.
pub const DEFAULT_CARD_LABEL: &str = "OBS-Camera";

/// Idle deadline, in seconds, after which the daemon exits.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Format the module parameter string embedding the device label.
pub fn card_label_param(label: &str) -> String {
    format!("card_label=\"{label}\"")
}
