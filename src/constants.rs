//! Global constants used throughout the mpdeps codebase.
//!
//! Timing parameters and file-name defaults shared by several modules are
//! defined here so the magic numbers stay discoverable.

use std::time::Duration;

/// Default interval at which readiness waits re-check their predicate (20ms).
///
/// Notifications wake waiters immediately; the interval only bounds the latency
/// for predicates over state that does not signal the gate.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

/// [`DEFAULT_POLL_INTERVAL_MS`] as a [`Duration`].
pub fn default_poll_interval() -> Duration {
    Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
}

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "mpdeps.toml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "MPDEPS_CONFIG";

/// Suffix appended to a unit's module name for its filter module.
pub const FILTER_MODULE_SUFFIX: &str = "Filters";

/// Prefix of the bindings that import mixin filter modules in a combined filter module.
pub const MIXIN_BINDING_PREFIX: &str = "__mixin";
