//! Plugin system for Hookrun.
//!
//! This module implements a process-based plugin system: plugins are
//! standalone executables discovered in well-known directories and invoked
//! as short-lived subprocesses, one process per hook call.
//!
//! # Architecture
//!
//! - `protocol`: the JSON wire types shared by host and plugin
//! - `executor`: spawns one subprocess per hook call with a bounded timeout
//! - `registry`: scans plugin directories and probes candidates for a manifest
//! - `router`: routes hooks to capable plugins and merges context patches
//! - `sdk`: the decoder plugin binaries use to read their inbound request
//!
//! # Protocol
//!
//! The host writes one JSON [`HookRequest`] to the plugin's stdin (or to the
//! `HOOKRUN_REQUEST` environment variable when the plugin needs stdin for
//! its own interactive session) and reads one JSON [`HookResponse`] from its
//! stdout after the process exits. Plugins declare the hooks they implement
//! via the `manifest` hook; the host never routes a hook to a plugin that
//! does not advertise it.
//!
//! # Example manifest exchange
//!
//! ```text
//! host -> plugin (stdin):  {"hook":"manifest"}
//! plugin -> host (stdout): {"data":{"name":"sentinel","version":"1.2.0",
//!                           "capabilities":["manifest","context","command"]}}
//! ```

mod error;
mod executor;
mod protocol;
mod registry;
mod router;
mod sdk;

pub use error::{PluginError, PluginResult};
pub use executor::{HookExecutor, RequestTransport, COMMAND_HOOK_TIMEOUT, DEFAULT_HOOK_TIMEOUT};
pub use protocol::{
    AssetOffer, ContextPatch, HookRequest, HookResponse, PluginManifest, SharedContext,
    HOOK_ASSETS, HOOK_COMMAND, HOOK_CONTEXT, HOOK_MANIFEST, REQUEST_ENV_VAR,
};
pub use registry::{
    install_plugin, install_plugin_to, uninstall_plugin, uninstall_plugin_from, LoadedPlugin,
    PluginRegistry, PLUGIN_DIR_NAME, PLUGIN_PREFIX,
};
pub use router::HookRouter;
pub use sdk::HookInput;
