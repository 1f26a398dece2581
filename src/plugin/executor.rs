//! Subprocess execution of plugin hooks.
//!
//! One hook call is one child process: the request goes in, the process
//! runs to completion (or is killed at the deadline), and exactly one
//! response comes back out. No state survives between two calls to the same
//! plugin; the executor is fully stateless.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use super::{HookRequest, HookResponse, PluginError, PluginResult, REQUEST_ENV_VAR};

/// Default timeout for non-interactive hook calls (manifest, context, assets).
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the interactive `command` hook. Long enough that a user's
/// interactive session is not killed mid-use, but still bounded.
pub const COMMAND_HOOK_TIMEOUT: Duration = Duration::from_secs(3600);

/// Poll interval while waiting for a child process to exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How the serialized request reaches the plugin process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTransport {
    /// Write the request to the child's stdin (the default).
    Stdin,
    /// Pass the request via the `HOOKRUN_REQUEST` environment variable and
    /// leave stdin attached to the terminal, for plugins that run their own
    /// interactive session (chat loops, full-screen TUIs on stderr/tty).
    Env,
}

/// Spawns one subprocess per hook call.
#[derive(Debug, Clone, Default)]
pub struct HookExecutor {
    /// Working directory for spawned plugins; defaults to the host's own.
    working_dir: Option<PathBuf>,
}

impl HookExecutor {
    /// Create a new executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory plugins are spawned in. The `command` hook
    /// uses this to run plugins against the project root.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Invoke a hook on a plugin executable over the stdin transport.
    pub fn invoke(
        &self,
        executable: &Path,
        request: &HookRequest,
        timeout: Duration,
    ) -> PluginResult<HookResponse> {
        self.invoke_with(executable, request, timeout, RequestTransport::Stdin)
    }

    /// Invoke a hook with an explicit request transport.
    ///
    /// Spawns the executable, delivers the serialized request, buffers the
    /// child's stdout in full, and parses it as exactly one [`HookResponse`]
    /// after the process exits. Failure classification:
    ///
    /// - deadline expired -> the child is killed, [`PluginError::Timeout`]
    /// - non-zero exit or unparsable stdout -> [`PluginError::Protocol`]
    ///   with captured stderr
    /// - parsed response with non-empty `error` ->
    ///   [`PluginError::PluginReported`] (any `data` discarded)
    pub fn invoke_with(
        &self,
        executable: &Path,
        request: &HookRequest,
        timeout: Duration,
        transport: RequestTransport,
    ) -> PluginResult<HookResponse> {
        let payload = serde_json::to_string(request).map_err(|e| PluginError::Protocol {
            detail: format!("failed to encode request: {e}"),
            stderr: String::new(),
        })?;

        let mut cmd = Command::new(executable);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        match transport {
            RequestTransport::Stdin => {
                cmd.stdin(Stdio::piped());
            }
            RequestTransport::Env => {
                cmd.env(REQUEST_ENV_VAR, &payload);
                cmd.stdin(Stdio::inherit());
            }
        }
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;

        // Write stdin and drain stdout/stderr on their own threads. A request
        // larger than the pipe buffer, or a plugin that writes output before
        // reading its input, must never stall the deadline loop below.
        if transport == RequestTransport::Stdin {
            if let Some(mut stdin) = child.stdin.take() {
                let bytes = payload.into_bytes();
                std::thread::spawn(move || {
                    // A plugin may exit without reading its stdin; a broken
                    // pipe here is not an error on its own.
                    let _ = stdin.write_all(&bytes);
                });
            }
        }
        let stdout_pipe = child.stdout.take();
        let stdout_handle = std::thread::spawn(move || read_pipe(stdout_pipe));
        let stderr_pipe = child.stderr.take();
        let stderr_handle = std::thread::spawn(move || read_pipe(stderr_pipe));

        let status = match wait_with_deadline(&mut child, timeout)? {
            Some(status) => status,
            None => {
                child.kill()?;
                // Reap so the killed child never outlives the call.
                let _ = child.wait();
                return Err(PluginError::Timeout(plugin_label(executable), timeout.as_secs()));
            }
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        if !status.success() {
            return Err(PluginError::Protocol {
                detail: format!("plugin exited with {status}"),
                stderr,
            });
        }

        let response: HookResponse =
            serde_json::from_str(stdout.trim()).map_err(|e| PluginError::Protocol {
                detail: format!("unparsable plugin output: {e}"),
                stderr,
            })?;

        if response.is_error() {
            return Err(PluginError::PluginReported(
                response.error.unwrap_or_default(),
            ));
        }

        Ok(response)
    }
}

/// Wait for the child to exit, polling up to the deadline.
/// Returns `None` when the deadline expires with the child still running.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn read_pipe(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Human-readable plugin label for diagnostics.
fn plugin_label(executable: &Path) -> String {
    executable
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| executable.display().to_string())
}
