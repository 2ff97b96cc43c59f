//! Deadline-bounded HTTP transport.
//!
//! [`Transport`] sends one attempt and hands back a [`RawResponse`] whose
//! body is read only on demand. [`HttpTransport`] is the `reqwest` backed
//! implementation; the trait exists so the executor can be driven by a
//! scripted transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tokio::time::Instant;
use tracing::{debug, trace};
use url::Url;

use crate::error::{ClientError, Result};
use crate::header::HeaderSet;

/// Everything needed to send one attempt.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderSet,
    pub body: Option<serde_json::Value>,
}

enum Body {
    /// Unread body; the read must finish by `deadline`.
    Pending {
        response: reqwest::Response,
        budget: Duration,
        deadline: Instant,
    },
    Buffered(String),
}

/// Status line of a completed attempt plus a deferred body.
pub struct RawResponse {
    status: StatusCode,
    body: Body,
}

impl RawResponse {
    /// A response whose body has already been read.
    pub fn buffered(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Body::Buffered(body.into()),
        }
    }

    /// A response whose body is still on the wire. Reading it must complete
    /// within what is left of `budget`, counted from `started`.
    pub fn pending(response: reqwest::Response, budget: Duration, started: Instant) -> Self {
        Self {
            status: response.status(),
            body: Body::Pending {
                response,
                budget,
                deadline: started + budget,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase for the status, empty for non-standard codes.
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or_default()
    }

    /// Read the body as text.
    ///
    /// A body that does not arrive before the attempt's deadline is a
    /// [`ClientError::Timeout`], and the read is abandoned.
    pub async fn text(self) -> Result<String> {
        match self.body {
            Body::Buffered(text) => Ok(text),
            Body::Pending {
                response,
                budget,
                deadline,
            } => match tokio::time::timeout_at(deadline, response.text()).await {
                Err(_) => Err(ClientError::Timeout(budget)),
                Ok(Err(e)) if e.is_timeout() => Err(ClientError::Timeout(budget)),
                Ok(Err(e)) => Err(ClientError::Network(format!(
                    "failed to read response body: {}",
                    e
                ))),
                Ok(Ok(text)) => Ok(text),
            },
        }
    }
}

impl std::fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Sends a single HTTP attempt within a time budget.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, failing with [`ClientError::Timeout`] if no response
    /// arrives within `timeout`. The in-flight attempt is cancelled on expiry.
    async fn send(&self, request: &OutgoingRequest, timeout: Duration) -> Result<RawResponse>;
}

/// `reqwest` backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("yuihub-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Use an existing `reqwest` client (proxies, TLS roots, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutgoingRequest, timeout: Duration) -> Result<RawResponse> {
        // reqwest's own deadline also covers reading the body later on.
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .timeout(timeout);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        trace!("sending {} {} (budget {:?})", request.method, request.url, timeout);
        let started = Instant::now();

        // Dropping the send future on expiry aborts the in-flight attempt.
        match tokio::time::timeout(timeout, builder.send()).await {
            Err(_) => {
                debug!("{} {} cancelled after {:?}", request.method, request.url, timeout);
                Err(ClientError::Timeout(timeout))
            }
            Ok(Err(e)) if e.is_timeout() => Err(ClientError::Timeout(timeout)),
            Ok(Err(e)) if e.is_builder() => Err(ClientError::InvalidRequest(e.to_string())),
            Ok(Err(e)) => Err(ClientError::Network(e.to_string())),
            Ok(Ok(response)) => Ok(RawResponse::pending(response, timeout, started)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{CONTENT_TYPE, TOKEN_HEADER};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(server: &MockServer, route: &str) -> OutgoingRequest {
        let mut headers = HeaderSet::new();
        headers.insert(CONTENT_TYPE, "application/json");
        OutgoingRequest {
            method: Method::GET,
            url: Url::parse(&format!("{}{}", server.uri(), route)).unwrap(),
            headers,
            body: None,
        }
    }

    #[tokio::test]
    async fn test_send_returns_status_and_deferred_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let response = transport
            .send(&request(&server, "/health"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_send_headers_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/new"))
            .and(header("content-type", "application/json"))
            .and(header(TOKEN_HEADER, "abc123"))
            .and(body_json(serde_json::json!({})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let mut outgoing = request(&server, "/threads/new");
        outgoing.method = Method::POST;
        outgoing.headers.insert(TOKEN_HEADER, "abc123");
        outgoing.body = Some(serde_json::json!({}));

        let response = HttpTransport::new()
            .unwrap()
            .send(&outgoing, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_send_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let result = HttpTransport::new()
            .unwrap()
            .send(&request(&server, "/slow"), Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(ClientError::Timeout(d)) if d == Duration::from_millis(100)));
    }

    /// Serve one connection: send headers and part of the body, then stall.
    async fn stalled_body_server() -> Url {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"ok\":",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });
        Url::parse(&format!("http://{}/health", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_stalled_body_read_times_out() {
        let outgoing = OutgoingRequest {
            method: Method::GET,
            url: stalled_body_server().await,
            headers: HeaderSet::new(),
            body: None,
        };
        let budget = Duration::from_millis(300);

        let started = std::time::Instant::now();
        let response = HttpTransport::new()
            .unwrap()
            .send(&outgoing, budget)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let result = response.text().await;
        assert!(matches!(result, Err(ClientError::Timeout(d)) if d == budget));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_with_client_uses_given_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .and(header("user-agent", "custom-agent"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .user_agent("custom-agent")
            .build()
            .unwrap();
        let response = HttpTransport::with_client(client)
            .send(&request(&server, "/health"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let outgoing = OutgoingRequest {
            method: Method::GET,
            url: Url::parse(&format!("http://127.0.0.1:{}/health", port)).unwrap(),
            headers: HeaderSet::new(),
            body: None,
        };

        let result = HttpTransport::new()
            .unwrap()
            .send(&outgoing, Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(ClientError::Network(_))));
    }

    #[tokio::test]
    async fn test_invalid_header_value_is_invalid_request() {
        let server = MockServer::start().await;
        let mut outgoing = request(&server, "/health");
        outgoing.headers.insert(TOKEN_HEADER, "abc\n123");

        let result = HttpTransport::new()
            .unwrap()
            .send(&outgoing, Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }
}
