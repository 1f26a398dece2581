//! # Hookrun
//!
//! Hook-based plugin runner - extend your CLI with external plugin executables.
//!
//! Hookrun discovers plugin binaries on the local filesystem, asks each one
//! for a manifest, and routes named *hooks* to the plugins that advertise
//! them. Every hook call is a short-lived subprocess speaking a small JSON
//! protocol over stdin/stdout.
//!
//! ## Features
//!
//! - **Language-agnostic plugins**: any executable that reads one JSON
//!   request and writes one JSON response can be a plugin
//! - **Capability routing**: plugins declare the hooks they implement;
//!   hooks they don't advertise are never sent to them
//! - **Deterministic context merge**: plugin context patches apply in
//!   discovery order, last writer wins
//! - **Best-effort fan-out**: a broken plugin is skipped with a warning,
//!   never takes the whole command down
//!
//! ## Quick Start
//!
//! ```bash
//! # Install
//! cargo install hookrun
//!
//! # Drop a plugin binary into ~/.hookrun/plugins (name must start with "hookrun-")
//! hookrun install ./hookrun-sentinel
//!
//! # See what was discovered
//! hookrun list
//!
//! # Run a plugin command directly
//! hookrun run sentinel investigate pod-1 ns1
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]

pub mod plugin;

pub use plugin::{
    AssetOffer, HookExecutor, HookInput, HookRequest, HookResponse, HookRouter, LoadedPlugin,
    PluginError, PluginManifest, PluginRegistry, PluginResult, RequestTransport, SharedContext,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "hookrun";
