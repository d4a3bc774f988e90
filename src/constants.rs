//! Global constants used throughout the storefront-refs codebase.
//!
//! This module contains timeout durations and other numeric constants that
//! are shared between the resolver, the configuration layer and the CLI.

use std::time::Duration;

/// Default transport timeout for a catalog lookup, in seconds.
///
/// A lookup that does not complete within this bound counts as a failed
/// fetch for the `resolve` call that issued it.
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Timeout for waiting on another call's in-flight lookup.
///
/// Slightly longer than [`DEFAULT_LOOKUP_TIMEOUT_SECS`] so a waiter normally
/// observes the owner's result (success or failure) rather than timing out
/// first. The bound covers the whole wait of one `resolve` call; when it
/// expires the waiter answers from the memo table.
pub const PENDING_STATE_TIMEOUT: Duration = Duration::from_secs(12);

/// Environment variable overriding the global configuration file path.
pub const CONFIG_PATH_ENV: &str = "SFREFS_CONFIG_PATH";

/// Directory name (under the home directory) holding the global config.
pub const CONFIG_DIR_NAME: &str = ".sfrefs";

/// File name of the global configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
