use std::time::Duration;

/// Errors surfaced by a logical YuiHub call.
///
/// Every variant is scoped to the single call that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection, DNS or TLS failure. Never retried.
    #[error("network error: {0}")]
    Network(String),

    /// The attempt did not complete within its budget and was cancelled.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The server rejected the credential (401 or 403).
    #[error("HTTP {status} {reason}{}", snippet_suffix(.snippet))]
    Auth {
        status: u16,
        reason: String,
        snippet: Option<String>,
    },

    /// Any other non-2xx status.
    #[error("HTTP {status} {reason}{}", snippet_suffix(.snippet))]
    Http {
        status: u16,
        reason: String,
        snippet: Option<String>,
    },

    /// The body was not the expected JSON, or lacked required data.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request could not be built (bad URL, unencodable header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP client could not be constructed.
    #[error("configuration error: {0}")]
    Config(String),
}

fn snippet_suffix(snippet: &Option<String>) -> String {
    match snippet {
        Some(s) if !s.is_empty() => format!(": {}", s),
        _ => String::new(),
    }
}

impl ClientError {
    /// Build the status error for a completed, non-2xx response.
    pub(crate) fn from_status(status: u16, reason: &str, snippet: Option<String>) -> Self {
        let reason = reason.to_string();
        if matches!(status, 401 | 403) {
            Self::Auth {
                status,
                reason,
                snippet,
            }
        } else {
            Self::Http {
                status,
                reason,
                snippet,
            }
        }
    }

    /// HTTP status carried by the error, when the call reached the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller should ask the user to (re)configure credentials.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Result type for YuiHub client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
