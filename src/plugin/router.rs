//! Hook routing and context merging across discovered plugins.
//!
//! Aggregate operations (`collect_assets`, `run_context_hook`) are
//! best-effort: a failing plugin is logged and skipped, never aborting the
//! pass. `run_command` is the one strict path, because there the plugin is
//! the requested unit of work rather than one contributor among many.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use super::{
    AssetOffer, ContextPatch, HookExecutor, HookRequest, HookResponse, LoadedPlugin, PluginError,
    PluginManifest, PluginRegistry, PluginResult, RequestTransport, SharedContext,
    COMMAND_HOOK_TIMEOUT, DEFAULT_HOOK_TIMEOUT, HOOK_ASSETS, HOOK_COMMAND, HOOK_CONTEXT,
};

/// Routes hooks to the plugins that advertise them.
#[derive(Debug)]
pub struct HookRouter<'a> {
    registry: &'a PluginRegistry,
    executor: HookExecutor,
    hook_timeout: Duration,
    command_timeout: Duration,
    /// Working directory for `command` hook plugins (the project root).
    project_root: Option<PathBuf>,
}

impl<'a> HookRouter<'a> {
    /// Create a router over an already-discovered registry.
    pub fn new(registry: &'a PluginRegistry) -> Self {
        Self {
            registry,
            executor: HookExecutor::new(),
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            command_timeout: COMMAND_HOOK_TIMEOUT,
            project_root: None,
        }
    }

    /// Override the timeout for non-interactive hook calls.
    #[must_use]
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    /// Override the timeout for the interactive `command` hook.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the project root that `command` hook plugins run against.
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Manifests of every loaded plugin, in discovery order.
    pub fn list_plugins(&self) -> Vec<&PluginManifest> {
        self.registry.plugins().iter().map(|p| &p.manifest).collect()
    }

    /// Collect asset directories from every plugin advertising `assets`.
    ///
    /// Relative offers resolve against the plugin's own executable
    /// directory. Per-plugin failures are logged and skipped; this call
    /// never fails outright.
    pub fn collect_assets(&self) -> Vec<PathBuf> {
        let mut assets = Vec::new();
        for plugin in self.capable(HOOK_ASSETS) {
            let request = HookRequest::new(HOOK_ASSETS);
            match self.executor.invoke(&plugin.path, &request, self.hook_timeout) {
                Ok(response) => match serde_json::from_value::<AssetOffer>(response.data) {
                    Ok(offer) => assets.push(offer.resolve(plugin.dir())),
                    Err(err) => {
                        warn!(plugin = plugin.name(), "invalid asset offer: {err}");
                    }
                },
                Err(err) => {
                    warn!(plugin = plugin.name(), "assets hook failed: {err}");
                }
            }
        }
        assets
    }

    /// Fan the `context` hook out to every plugin advertising it and merge
    /// the returned patches into `ctx`, in discovery order.
    ///
    /// Merge is shallow: on a key collision the later plugin's value
    /// replaces the earlier one's. Per-plugin failures are logged and the
    /// pass continues.
    pub fn run_context_hook(&self, ctx: &mut SharedContext) {
        let snapshot = match serde_json::to_value(&*ctx) {
            Ok(value) => value,
            Err(err) => {
                warn!("cannot serialize shared context, skipping context hook: {err}");
                return;
            }
        };

        for plugin in self.capable(HOOK_CONTEXT) {
            let request = HookRequest::new(HOOK_CONTEXT).with_context(snapshot.clone());
            match self.executor.invoke(&plugin.path, &request, self.hook_timeout) {
                Ok(response) => match serde_json::from_value::<ContextPatch>(response.data) {
                    Ok(patch) => ctx.merge_patch(patch),
                    Err(err) => {
                        warn!(plugin = plugin.name(), "invalid context patch: {err}");
                    }
                },
                Err(err) => {
                    warn!(plugin = plugin.name(), "context hook failed: {err}");
                }
            }
        }
    }

    /// Run a named plugin's `command` hook directly.
    ///
    /// The request travels via the environment variable transport so the
    /// plugin keeps stdin for its own interactive use, and the plugin runs
    /// in the project root when one is set. Unlike the aggregate
    /// operations, failure here propagates to the caller: the user asked
    /// for this exact plugin.
    pub fn run_command(
        &self,
        name: &str,
        args: &[String],
        ctx: &SharedContext,
    ) -> PluginResult<HookResponse> {
        let plugin =
            self.registry.get(name).ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        if !plugin.manifest.supports(HOOK_COMMAND) {
            return Err(PluginError::UnsupportedHook(
                name.to_string(),
                HOOK_COMMAND.to_string(),
            ));
        }

        let context = serde_json::to_value(ctx).map_err(|e| PluginError::Protocol {
            detail: format!("cannot serialize shared context: {e}"),
            stderr: String::new(),
        })?;
        let request =
            HookRequest::new(HOOK_COMMAND).with_args(args.to_vec()).with_context(context);

        let executor = match &self.project_root {
            Some(root) => self.executor.clone().with_working_dir(root.clone()),
            None => self.executor.clone(),
        };
        executor.invoke_with(&plugin.path, &request, self.command_timeout, RequestTransport::Env)
    }

    /// Plugins advertising the given hook, in discovery order.
    fn capable<'h>(&'h self, hook: &'h str) -> impl Iterator<Item = &'h LoadedPlugin> + 'h {
        self.registry.plugins().iter().filter(move |p| p.manifest.supports(hook))
    }
}
