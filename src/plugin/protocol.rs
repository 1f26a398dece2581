//! Wire protocol shared between the host and plugin processes.
//!
//! Every hook call is one JSON [`HookRequest`] in and one JSON
//! [`HookResponse`] out. Payloads (`context`, `data`) are arbitrary JSON
//! values so anything representable on the wire survives without loss.
//! Decoding is forward-compatible: unknown fields are tolerated, never a
//! decode failure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hook invoked once at discovery time to obtain a plugin's manifest.
pub const HOOK_MANIFEST: &str = "manifest";
/// Hook that lets plugins contribute entries to the shared project context.
pub const HOOK_CONTEXT: &str = "context";
/// Hook that lets plugins offer asset/template directories to the host.
pub const HOOK_ASSETS: &str = "assets";
/// Hook for direct, user-invoked plugin commands.
pub const HOOK_COMMAND: &str = "command";

/// Environment variable carrying a serialized [`HookRequest`] when stdin is
/// reserved for the plugin's own interactive session.
pub const REQUEST_ENV_VAR: &str = "HOOKRUN_REQUEST";

/// A plugin's self-description, returned from the `manifest` hook.
///
/// Capabilities are an open set of strings. Third-party plugins may declare
/// hooks this host does not know; it simply never routes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name (unique identifier, required).
    pub name: String,
    /// Plugin version (informational only, never enforced).
    #[serde(default)]
    pub version: String,
    /// Hooks this plugin implements.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl PluginManifest {
    /// Whether this plugin advertises the given hook.
    pub fn supports(&self, hook: &str) -> bool {
        self.capabilities.iter().any(|c| c == hook)
    }
}

/// Request sent host -> plugin, one JSON object per invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookRequest {
    /// Name of the hook being invoked.
    pub hook: String,
    /// Command-line style tokens, used by the `command` hook.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Serialized shared project context, used by the `context` hook.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
}

impl HookRequest {
    /// Create a request for the given hook with no args and no context.
    pub fn new(hook: impl Into<String>) -> Self {
        Self { hook: hook.into(), args: Vec::new(), context: Value::Null }
    }

    /// Attach command-line style arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Attach a serialized context payload.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Response sent plugin -> host.
///
/// Discriminated union in spirit: a non-empty `error` means the call failed
/// regardless of any `data` present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookResponse {
    /// Hook-specific payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    /// Failure reported by the plugin itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookResponse {
    /// A successful response carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self { data, error: None }
    }

    /// A failed response carrying an error message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self { data: Value::Null, error: Some(message.into()) }
    }

    /// Whether the plugin reported a failure.
    pub fn is_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// Expected `data` shape for the `context` hook: a flat map merged
/// key-for-key into the shared context.
pub type ContextPatch = serde_json::Map<String, Value>;

/// Expected `data` shape for the `assets` hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetOffer {
    /// Asset directory; relative paths are anchored at the plugin's own
    /// executable directory, not the caller's working directory.
    pub path: String,
}

impl AssetOffer {
    /// Resolve the offered path against the plugin's executable directory.
    pub fn resolve(&self, plugin_dir: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            plugin_dir.join(path)
        }
    }
}

/// Shared project context, owned by the orchestration layer.
///
/// Plugins receive a serialized copy in the `context` hook request and
/// contribute flat patches back; only
/// [`HookRouter::run_context_hook`](super::HookRouter::run_context_hook)
/// writes into `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedContext {
    /// Flat key/value bag.
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
}

impl SharedContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a plugin patch into the context.
    ///
    /// Shallow, key-for-key overwrite: an existing value for a colliding key
    /// is replaced, never deep-merged. Callers apply patches in discovery
    /// order, so the last plugin wins on collisions.
    pub fn merge_patch(&mut self, patch: ContextPatch) {
        for (key, value) in patch {
            self.data.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manifest_supports() {
        let manifest = PluginManifest {
            name: "sentinel".to_string(),
            version: "1.0.0".to_string(),
            capabilities: vec!["manifest".to_string(), "context".to_string()],
        };

        assert!(manifest.supports(HOOK_MANIFEST));
        assert!(manifest.supports(HOOK_CONTEXT));
        assert!(!manifest.supports(HOOK_COMMAND));
        // Unknown capability strings are fine; membership is just string comparison.
        assert!(!manifest.supports("telemetry"));
    }

    #[test]
    fn test_request_roundtrip() {
        let request = HookRequest::new(HOOK_COMMAND)
            .with_args(vec!["investigate".to_string(), "pod-1".to_string()])
            .with_context(json!({
                "cluster": "prod-eu",
                "nodes": [1, 2, 3],
                "nested": {"deep": {"flag": true, "none": null}}
            }));

        let encoded = serde_json::to_string(&request).unwrap();
        let decoded: HookRequest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_response_roundtrip() {
        let response = HookResponse::ok(json!({
            "x": 1.5,
            "items": ["a", "b"],
            "map": {"k": {"v": [null, false]}}
        }));

        let encoded = serde_json::to_string(&response).unwrap();
        let decoded: HookResponse = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, response);
        assert!(!decoded.is_error());
    }

    #[test]
    fn test_response_error_wins_over_data() {
        let response: HookResponse =
            serde_json::from_str(r#"{"data": {"x": 1}, "error": "pod not found"}"#).unwrap();
        assert!(response.is_error());

        // Empty error string is not a failure.
        let response: HookResponse = serde_json::from_str(r#"{"data": 1, "error": ""}"#).unwrap();
        assert!(!response.is_error());
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let manifest: PluginManifest = serde_json::from_str(
            r#"{"name": "scout", "version": "0.1.0", "capabilities": [], "homepage": "x"}"#,
        )
        .unwrap();
        assert_eq!(manifest.name, "scout");

        let response: HookResponse =
            serde_json::from_str(r#"{"data": null, "trace_id": "abc"}"#).unwrap();
        assert!(!response.is_error());
    }

    #[test]
    fn test_minimal_request_decodes() {
        let request: HookRequest = serde_json::from_str(r#"{"hook": "manifest"}"#).unwrap();
        assert_eq!(request.hook, "manifest");
        assert!(request.args.is_empty());
        assert!(request.context.is_null());
    }

    #[test]
    fn test_asset_offer_resolution() {
        let offer = AssetOffer { path: "bin/assets".to_string() };
        let resolved = offer.resolve(Path::new("/home/user/.hookrun/plugins"));
        assert_eq!(resolved, PathBuf::from("/home/user/.hookrun/plugins/bin/assets"));

        let offer = AssetOffer { path: "/opt/shared/assets".to_string() };
        let resolved = offer.resolve(Path::new("/home/user/.hookrun/plugins"));
        assert_eq!(resolved, PathBuf::from("/opt/shared/assets"));
    }

    #[test]
    fn test_merge_patch_is_shallow() {
        let mut ctx = SharedContext::new();
        ctx.data.insert("kube".to_string(), json!({"version": "1.29", "cni": "cilium"}));

        let mut patch = ContextPatch::new();
        patch.insert("kube".to_string(), json!({"version": "1.30"}));
        ctx.merge_patch(patch);

        // Whole value replaced, not deep-merged: "cni" is gone.
        assert_eq!(ctx.data["kube"], json!({"version": "1.30"}));
    }

    #[test]
    fn test_merge_patch_last_writer_wins() {
        let mut ctx = SharedContext::new();

        let mut first = ContextPatch::new();
        first.insert("x".to_string(), json!(1));
        ctx.merge_patch(first);

        let mut second = ContextPatch::new();
        second.insert("x".to_string(), json!(2));
        second.insert("y".to_string(), json!(3));
        ctx.merge_patch(second);

        assert_eq!(ctx.data["x"], json!(2));
        assert_eq!(ctx.data["y"], json!(3));
    }
}
