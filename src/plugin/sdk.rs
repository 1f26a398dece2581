//! Plugin-side request decoding.
//!
//! Plugin binaries link this crate and call [`HookInput::init`] once at
//! process start. The decoder tries the `HOOKRUN_REQUEST` environment
//! variable first, then stdin if it is a pipe rather than a terminal; both
//! sources feed the same parse path. A plugin started by hand (no request
//! anywhere) gets an empty input and is free to run standalone - that is
//! not an error.
//!
//! ```no_run
//! use hookrun::plugin::{HookInput, HOOK_COMMAND};
//!
//! let input = HookInput::init();
//! match input.hook() {
//!     "manifest" => HookInput::reply(serde_json::json!({
//!         "name": "sentinel",
//!         "version": "1.0.0",
//!         "capabilities": ["manifest", "command"],
//!     })),
//!     HOOK_COMMAND => {
//!         let target = input.args().first().map(String::as_str).unwrap_or("");
//!         // ... plugin business logic ...
//!         HookInput::reply(serde_json::json!({ "investigated": target }))
//!     }
//!     _ => HookInput::reply_error("unsupported hook"),
//! }
//! ```

use std::io::{IsTerminal, Read};

use serde_json::Value;

use super::{HookRequest, HookResponse, REQUEST_ENV_VAR};

/// The decoded inbound request, as seen from inside a plugin process.
#[derive(Debug, Clone, Default)]
pub struct HookInput {
    request: Option<HookRequest>,
}

impl HookInput {
    /// Decode the inbound request. Call once at process start.
    ///
    /// The environment variable is preferred over stdin so that a plugin
    /// running its own interactive session keeps the stream for itself.
    pub fn init() -> Self {
        if let Ok(raw) = std::env::var(REQUEST_ENV_VAR) {
            return Self::decode(raw.as_bytes());
        }

        let mut stdin = std::io::stdin();
        if !stdin.is_terminal() {
            let mut buf = Vec::new();
            if stdin.read_to_end(&mut buf).is_ok() {
                return Self::decode(&buf);
            }
        }

        Self::default()
    }

    /// Decode a raw request. Malformed input yields an empty [`HookInput`]:
    /// the plugin falls back to standalone behavior instead of failing.
    fn decode(raw: &[u8]) -> Self {
        match serde_json::from_slice(raw) {
            Ok(request) => Self { request: Some(request) },
            Err(_) => Self::default(),
        }
    }

    /// Whether a request was actually received.
    pub fn has_request(&self) -> bool {
        self.request.is_some()
    }

    /// Name of the invoked hook; empty in standalone mode.
    pub fn hook(&self) -> &str {
        self.request.as_ref().map_or("", |r| r.hook.as_str())
    }

    /// Command-line style arguments from the request.
    pub fn args(&self) -> &[String] {
        self.request.as_ref().map_or(&[], |r| r.args.as_slice())
    }

    /// The serialized shared context; `null` when absent.
    pub fn context(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.request.as_ref().map_or(&NULL, |r| &r.context)
    }

    /// Convenience lookup into the flat `data` map of the shared context.
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context().get("data").and_then(|data| data.get(key))
    }

    /// Print a successful response to stdout for the host to collect.
    pub fn reply(data: Value) {
        print_response(&HookResponse::ok(data));
    }

    /// Print a failure response to stdout for the host to collect.
    pub fn reply_error(message: impl Into<String>) {
        print_response(&HookResponse::fail(message));
    }
}

fn print_response(response: &HookResponse) {
    // HookResponse serialization cannot fail; fall back to a bare error
    // object just in case the payload ever learns how to.
    let encoded = serde_json::to_string(response)
        .unwrap_or_else(|_| r#"{"error": "response encoding failed"}"#.to_string());
    println!("{encoded}");
}
