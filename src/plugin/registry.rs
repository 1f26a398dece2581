//! Plugin discovery and the in-memory registry.
//!
//! Discovery scans well-known directories for executables matching the
//! `hookrun-` naming convention, probes each candidate with the `manifest`
//! hook, and keeps only the ones that answer validly. The resulting plugin
//! list is built once per session and treated as read-only afterward.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::{
    HookExecutor, HookRequest, PluginError, PluginManifest, PluginResult, DEFAULT_HOOK_TIMEOUT,
    HOOK_MANIFEST,
};

/// Filename prefix a candidate executable must carry to be probed.
pub const PLUGIN_PREFIX: &str = "hookrun-";

/// Dot-prefixed config folder holding the `plugins` subdirectory.
pub const PLUGIN_DIR_NAME: &str = ".hookrun";

/// A plugin that answered the `manifest` probe validly.
///
/// The path is the one found at scan time and is not re-validated before
/// later invocations; if the file disappears, the next call against it is
/// reported like any other per-plugin failure.
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    /// The plugin's self-description, immutable for the session.
    pub manifest: PluginManifest,
    /// Path to the plugin executable.
    pub path: PathBuf,
}

impl LoadedPlugin {
    /// Plugin name from the manifest.
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Directory containing the plugin executable. Relative asset offers
    /// resolve against this, not the caller's working directory.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Holds the plugins discovered this session.
#[derive(Debug)]
pub struct PluginRegistry {
    plugins: Vec<LoadedPlugin>,
    executor: HookExecutor,
    probe_timeout: Duration,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Create an empty registry with the default probe timeout.
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            executor: HookExecutor::new(),
            probe_timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    /// Override the timeout used for `manifest` probes.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Default discovery directories: the user-wide plugin folder first,
    /// then the project-local one. This order is also merge precedence:
    /// a later-scanned plugin's context patch overwrites an earlier one's.
    pub fn default_plugin_dirs() -> Vec<PathBuf> {
        let mut dirs_out = Vec::new();
        if let Some(home) = dirs::home_dir() {
            dirs_out.push(home.join(PLUGIN_DIR_NAME).join("plugins"));
        }
        dirs_out.push(PathBuf::from(PLUGIN_DIR_NAME).join("plugins"));
        dirs_out
    }

    /// Scan the given directories, in order, and replace the registry's
    /// plugin set with the candidates that answer the `manifest` probe.
    ///
    /// Best-effort: a candidate that fails to exec, times out, or returns a
    /// bad manifest is skipped with a warning. A missing directory
    /// contributes zero plugins; an unreadable one logs a warning.
    pub fn discover(&mut self, directories: &[PathBuf]) {
        self.plugins.clear();
        for dir in directories {
            for path in candidate_executables(dir) {
                match self.probe(&path) {
                    Ok(plugin) => {
                        debug!(plugin = plugin.name(), path = %path.display(), "loaded plugin");
                        self.plugins.push(plugin);
                    }
                    Err(err) => {
                        warn!(path = %path.display(), "skipping plugin: {err}");
                    }
                }
            }
        }
    }

    /// Ask one candidate for its manifest.
    fn probe(&self, path: &Path) -> PluginResult<LoadedPlugin> {
        let response =
            self.executor.invoke(path, &HookRequest::new(HOOK_MANIFEST), self.probe_timeout)?;
        let manifest: PluginManifest = serde_json::from_value(response.data)
            .map_err(|e| PluginError::InvalidManifest(e.to_string()))?;
        if manifest.name.is_empty() {
            return Err(PluginError::InvalidManifest("plugin name is required".to_string()));
        }
        Ok(LoadedPlugin { manifest, path: path.to_path_buf() })
    }

    /// Loaded plugins, in discovery order.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Look up a loaded plugin by manifest name.
    pub fn get(&self, name: &str) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// Number of loaded plugins.
    pub fn count(&self) -> usize {
        self.plugins.len()
    }

    /// Whether discovery found anything.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// List probe candidates in a directory: regular files with the executable
/// bit set whose names start with [`PLUGIN_PREFIX`], sorted by filename.
fn candidate_executables(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!(dir = %dir.display(), "cannot read plugin directory: {err}");
            return Vec::new();
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(OsStr::to_str)
                .is_some_and(|name| name.starts_with(PLUGIN_PREFIX))
        })
        .filter(|path| is_executable(path))
        .collect();
    candidates.sort();
    candidates
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    // Windows has no executable bit; the prefix filter stands alone.
    true
}

/// Copy a plugin binary into the user plugin directory.
///
/// Administrative operation with strict, propagating errors: the user asked
/// for this exact install, so a missing source or uncreatable destination
/// is a real failure, not a warning.
pub fn install_plugin(source: &Path) -> PluginResult<PathBuf> {
    let dest_dir = dirs::home_dir()
        .ok_or_else(|| PluginError::Install("cannot determine home directory".to_string()))?
        .join(PLUGIN_DIR_NAME)
        .join("plugins");
    install_plugin_to(source, &dest_dir)
}

/// [`install_plugin`] with an explicit destination directory.
pub fn install_plugin_to(source: &Path, dest_dir: &Path) -> PluginResult<PathBuf> {
    if !source.is_file() {
        return Err(PluginError::NotFound(source.display().to_string()));
    }
    let file_name = source
        .file_name()
        .ok_or_else(|| PluginError::Install(format!("not a plugin binary: {}", source.display())))?;

    std::fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(file_name);
    // std::fs::copy carries the source permissions, executable bit included.
    std::fs::copy(source, &dest)?;
    Ok(dest)
}

/// Remove an installed plugin binary from the user plugin directory.
/// Strict errors, like install.
pub fn uninstall_plugin(name: &str) -> PluginResult<()> {
    let dest_dir = dirs::home_dir()
        .ok_or_else(|| PluginError::Install("cannot determine home directory".to_string()))?
        .join(PLUGIN_DIR_NAME)
        .join("plugins");
    uninstall_plugin_from(name, &dest_dir)
}

/// [`uninstall_plugin`] with an explicit plugin directory.
pub fn uninstall_plugin_from(name: &str, dir: &Path) -> PluginResult<()> {
    let file_name =
        if name.starts_with(PLUGIN_PREFIX) { name.to_string() } else { format!("{PLUGIN_PREFIX}{name}") };
    let path = dir.join(file_name);
    if !path.is_file() {
        return Err(PluginError::NotFound(path.display().to_string()));
    }
    std::fs::remove_file(&path)?;
    Ok(())
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// A shell-script plugin answering the manifest probe.
    fn write_plugin(dir: &Path, file: &str, name: &str, capabilities: &[&str]) -> PathBuf {
        let caps = capabilities
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(",");
        let body = format!(
            r#"#!/bin/sh
echo '{{"data": {{"name": "{name}", "version": "0.1.0", "capabilities": [{caps}]}}}}'
"#
        );
        let path = dir.join(file);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_discover_in_lexicographic_order() {
        let dir = TempDir::new().unwrap();
        // Written out of order on purpose.
        write_plugin(dir.path(), "hookrun-beta", "beta", &["manifest"]);
        write_plugin(dir.path(), "hookrun-alpha", "alpha", &["manifest"]);

        let mut registry = PluginRegistry::new();
        registry.discover(&[dir.path().to_path_buf()]);

        let names: Vec<&str> = registry.plugins().iter().map(LoadedPlugin::name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_directory_order_before_filename_order() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write_plugin(home.path(), "hookrun-zulu", "zulu", &["manifest"]);
        write_plugin(project.path(), "hookrun-alpha", "alpha", &["manifest"]);

        let mut registry = PluginRegistry::new();
        registry.discover(&[home.path().to_path_buf(), project.path().to_path_buf()]);

        // Home-directory plugins come first even when the project plugin
        // sorts earlier by filename.
        let names: Vec<&str> = registry.plugins().iter().map(LoadedPlugin::name).collect();
        assert_eq!(names, vec!["zulu", "alpha"]);
    }

    #[test]
    fn test_non_executable_never_probed() {
        let dir = TempDir::new().unwrap();
        let path = write_plugin(dir.path(), "hookrun-passive", "passive", &["manifest"]);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let mut registry = PluginRegistry::new();
        registry.discover(&[dir.path().to_path_buf()]);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_prefix_filter_skips_unrelated_executables() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "some-other-tool", "other", &["manifest"]);
        write_plugin(dir.path(), "hookrun-real", "real", &["manifest"]);

        let mut registry = PluginRegistry::new();
        registry.discover(&[dir.path().to_path_buf()]);

        assert_eq!(registry.count(), 1);
        assert!(registry.get("real").is_some());
    }

    #[test]
    fn test_missing_directory_contributes_zero_plugins() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not-created-yet");

        let mut registry = PluginRegistry::new();
        registry.discover(&[missing]);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_bad_manifest_skipped_without_failing_discovery() {
        let dir = TempDir::new().unwrap();

        // Unparsable stdout.
        let noise = dir.path().join("hookrun-noise");
        fs::write(&noise, "#!/bin/sh\necho 'garbage'\n").unwrap();
        fs::set_permissions(&noise, fs::Permissions::from_mode(0o755)).unwrap();

        // Empty name.
        let anon = dir.path().join("hookrun-anon");
        fs::write(&anon, "#!/bin/sh\necho '{\"data\": {\"name\": \"\"}}'\n").unwrap();
        fs::set_permissions(&anon, fs::Permissions::from_mode(0o755)).unwrap();

        // Non-zero exit.
        let broken = dir.path().join("hookrun-broken");
        fs::write(&broken, "#!/bin/sh\nexit 1\n").unwrap();
        fs::set_permissions(&broken, fs::Permissions::from_mode(0o755)).unwrap();

        write_plugin(dir.path(), "hookrun-good", "good", &["manifest", "context"]);

        let mut registry = PluginRegistry::new();
        registry.discover(&[dir.path().to_path_buf()]);

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.plugins()[0].name(), "good");
    }

    #[test]
    fn test_rediscovery_replaces_set() {
        let dir = TempDir::new().unwrap();
        write_plugin(dir.path(), "hookrun-one", "one", &["manifest"]);

        let mut registry = PluginRegistry::new();
        registry.discover(&[dir.path().to_path_buf()]);
        registry.discover(&[dir.path().to_path_buf()]);

        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_install_preserves_executable_bit() {
        let source_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        let source = write_plugin(source_dir.path(), "hookrun-ship", "ship", &["manifest"]);

        let dest = install_plugin_to(&source, dest_dir.path()).unwrap();

        assert!(dest.is_file());
        assert!(is_executable(&dest));
        assert_eq!(dest.file_name().unwrap(), "hookrun-ship");
    }

    #[test]
    fn test_install_missing_source_fails() {
        let dest_dir = TempDir::new().unwrap();
        let result = install_plugin_to(Path::new("/nonexistent/hookrun-ghost"), dest_dir.path());
        assert!(matches!(result, Err(PluginError::NotFound(_))));
    }

    #[test]
    fn test_uninstall_roundtrip() {
        let source_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        let source = write_plugin(source_dir.path(), "hookrun-brief", "brief", &["manifest"]);
        install_plugin_to(&source, dest_dir.path()).unwrap();

        // Accepts the bare name and prepends the prefix.
        uninstall_plugin_from("brief", dest_dir.path()).unwrap();
        assert!(!dest_dir.path().join("hookrun-brief").exists());

        let result = uninstall_plugin_from("brief", dest_dir.path());
        assert!(matches!(result, Err(PluginError::NotFound(_))));
    }
}
