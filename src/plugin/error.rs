//! Plugin system error types.

use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur during plugin operations.
///
/// Aggregate operations (discovery, asset collection, the context fan-out)
/// absorb these per plugin and log a warning; only `run_command` and the
/// install/uninstall operations surface them to the caller.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No loaded plugin with the given name.
    #[error("Plugin not found: {0}")]
    NotFound(String),

    /// Manifest response failed to decode or is missing required fields.
    #[error("Invalid plugin manifest: {0}")]
    InvalidManifest(String),

    /// Plugin process did not exit before the deadline and was killed.
    #[error("Plugin '{0}' timed out after {1} seconds")]
    Timeout(String, u64),

    /// Non-zero exit or unparsable output; captured stderr kept for diagnostics.
    #[error("Plugin protocol error: {detail}")]
    Protocol { detail: String, stderr: String },

    /// Plugin answered with a well-formed response carrying a non-empty error.
    #[error("Plugin reported error: {0}")]
    PluginReported(String),

    /// Plugin does not advertise the requested hook.
    #[error("Plugin '{0}' does not support hook '{1}'")]
    UnsupportedHook(String, String),

    /// Plugin installation failed.
    #[error("Plugin installation failed: {0}")]
    Install(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
