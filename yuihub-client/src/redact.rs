//! HTTP diagnostics with secrets masked.
//!
//! [`RedactingLogger`] writes one line per event to a [`DiagnosticSink`].
//! Authentication headers are always replaced by [`MASK`]; response bodies
//! are only logged when enabled, truncated to [`BODY_SNIPPET_LIMIT`]
//! characters and scrubbed of anything that looks like a bearer token.

use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex::Regex;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::ClientError;
use crate::header::{HeaderChoice, HeaderSet, is_sensitive};

/// Replacement for secret values in diagnostics.
pub const MASK: &str = "***";

/// Maximum number of characters of a response body that is logged.
pub const BODY_SNIPPET_LIMIT: usize = 400;

static BEARER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(bearer\s+)\S+").expect("bearer pattern is valid"));

/// Destination for diagnostic lines.
///
/// Implementations must not fail; a line that cannot be written is dropped.
pub trait DiagnosticSink: Send + Sync {
    fn append_line(&self, line: &str);
}

/// Forwards diagnostics to `tracing` under the `yuihub::http` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn append_line(&self, line: &str) {
        tracing::info!(target: "yuihub::http", "{}", line);
    }
}

/// Keeps diagnostics in memory, e.g. to show them on demand.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn append_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Writes request and response diagnostics with secrets masked.
#[derive(Clone)]
pub struct RedactingLogger {
    sink: Arc<dyn DiagnosticSink>,
    log_bodies: bool,
}

impl RedactingLogger {
    pub fn new(sink: Arc<dyn DiagnosticSink>, log_bodies: bool) -> Self {
        Self { sink, log_bodies }
    }

    /// Whether response bodies should be read for diagnostics.
    pub fn logs_bodies(&self) -> bool {
        self.log_bodies
    }

    pub fn log_request(&self, method: &Method, url: &Url, headers: &HeaderSet) {
        self.sink.append_line(&format!("[HTTP] {} {}", method, url));
        if !headers.is_empty() {
            self.sink
                .append_line(&format!("[HTTP] headers={}", masked_headers(headers)));
        }
    }

    pub fn log_retry(&self, choice: HeaderChoice) {
        self.sink
            .append_line(&format!("[HTTP] retry with header={}", choice));
    }

    /// Log a completed attempt. `body` is ignored unless body logging is on.
    pub fn log_outcome(&self, method: &Method, url: &Url, status: StatusCode, body: Option<&str>) {
        if status.is_success() {
            self.sink.append_line(&format!(
                "[HTTP] OK {} {} ({})",
                method,
                url,
                status.as_u16()
            ));
        } else {
            self.sink.append_line(&format!(
                "[HTTP] ERROR {} {} -> {} {}",
                method,
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            ));
        }

        if let Some(snippet) = body.and_then(|b| self.snippet(b)) {
            self.sink.append_line(&format!("[HTTP] body: {}", snippet));
        }
    }

    /// Log an attempt that never produced a response.
    pub fn log_failure(&self, method: &Method, url: &Url, error: &ClientError) {
        self.sink
            .append_line(&format!("[HTTP] ERROR {} {} -> {}", method, url, error));
    }

    /// Truncated, scrubbed body text, or `None` when bodies are not logged.
    pub fn snippet(&self, body: &str) -> Option<String> {
        if !self.log_bodies || body.is_empty() {
            return None;
        }
        let truncated: String = body.chars().take(BODY_SNIPPET_LIMIT).collect();
        Some(scrub_bearer_tokens(&truncated).into_owned())
    }
}

impl Default for RedactingLogger {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink), false)
    }
}

impl std::fmt::Debug for RedactingLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedactingLogger")
            .field("log_bodies", &self.log_bodies)
            .finish_non_exhaustive()
    }
}

/// Render headers as a JSON object with authentication values masked.
pub fn masked_headers(headers: &HeaderSet) -> String {
    let map: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = if is_sensitive(name) { MASK } else { value };
            (name.to_string(), serde_json::Value::from(value))
        })
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// Replace the token following any `Bearer ` in `text` with [`MASK`].
pub fn scrub_bearer_tokens(text: &str) -> Cow<'_, str> {
    BEARER_TOKEN.replace_all(text, format!("${{1}}{}", MASK).as_str())
}
