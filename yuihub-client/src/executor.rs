//! The resilient request executor.
//!
//! One call to [`RequestExecutor::execute`] is one logical request. It makes
//! at most two physical attempts: the second only when the header preference
//! is `auto` and the first attempt was rejected with 401 or 403, in which
//! case the credential is resent under the other header. Each attempt gets
//! its own timeout budget and is logged through the [`RedactingLogger`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use yuihub_core::{AuthHeaderPreference, AuthScheme, CredentialResolver, Settings};

use crate::error::{ClientError, Result};
use crate::failover::{Attempt, Next, initial_choice, next_step};
use crate::header::build_headers;
use crate::redact::{DiagnosticSink, RedactingLogger, TracingSink};
use crate::transport::{HttpTransport, OutgoingRequest, RawResponse, Transport};

/// Query parameters; `None` and empty values are left out of the URL.
pub type QueryParams<'a> = &'a [(&'a str, Option<String>)];

/// Sends authenticated requests with single-shot header failover.
#[derive(Clone)]
pub struct RequestExecutor {
    base_url: String,
    credentials: CredentialResolver,
    preference: AuthHeaderPreference,
    scheme: AuthScheme,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    logger: RedactingLogger,
}

impl RequestExecutor {
    /// Start building an executor for the service at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> RequestExecutorBuilder {
        RequestExecutorBuilder::new(base_url)
    }

    /// Executor configured from user settings, using the HTTP transport and
    /// logging through `tracing`.
    pub fn from_settings(settings: &Settings, credentials: CredentialResolver) -> Result<Self> {
        Self::builder(settings.base_url())
            .credentials(credentials)
            .header_preference(settings.auth_header)
            .auth_scheme(settings.auth_scheme)
            .timeout(settings.request_timeout())
            .log_response_bodies(settings.log_response_bodies)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET path?params`, parsed as `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: QueryParams<'_>) -> Result<T> {
        self.execute(Method::GET, path, params, None).await
    }

    /// `POST path` with a JSON body, parsed as `T`.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidRequest(format!("unserializable body: {}", e)))?;
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    /// Run one logical request.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: QueryParams<'_>,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = build_url(&self.base_url, path, params)?;
        let credential = self.credentials.resolve();

        let mut choice = initial_choice(self.preference);
        let mut attempt = Attempt::First;

        loop {
            let request = OutgoingRequest {
                method: method.clone(),
                url: url.clone(),
                headers: build_headers(credential.as_ref(), choice, self.scheme),
                body: body.clone(),
            };
            if attempt == Attempt::Retry {
                self.logger.log_retry(choice);
            }
            self.logger.log_request(&method, &url, &request.headers);

            let response = match self.transport.send(&request, self.timeout).await {
                Ok(response) => response,
                Err(e) => {
                    self.logger.log_failure(&method, &url, &e);
                    return Err(e);
                }
            };

            let status = response.status().as_u16();
            match next_step(self.preference, attempt, choice, status) {
                Next::Retry(alternate) => {
                    debug!(
                        "{} {} rejected with {} using {}, retrying with {}",
                        method, url, status, choice, alternate
                    );
                    // The rejected body is never read.
                    self.logger
                        .log_outcome(&method, &url, response.status(), None);
                    choice = alternate;
                    attempt = Attempt::Retry;
                }
                Next::Finish => return self.finish(&method, &url, response).await,
            }
        }
    }

    async fn finish<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &Url,
        response: RawResponse,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let reason = response.reason();
            let body = if self.logger.logs_bodies() {
                response.text().await.unwrap_or_default()
            } else {
                String::new()
            };
            self.logger.log_outcome(method, url, status, Some(&body));
            return Err(ClientError::from_status(
                status.as_u16(),
                reason,
                self.logger.snippet(&body),
            ));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.logger.log_failure(method, url, &e);
                return Err(e);
            }
        };
        self.logger.log_outcome(method, url, status, Some(&body));

        serde_json::from_str(&body).map_err(|e| {
            ClientError::MalformedResponse(format!("{} {}: {}", method, url.path(), e))
        })
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url)
            .field("preference", &self.preference)
            .field("scheme", &self.scheme)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Join `base_url` and `path` and append the non-empty parameters.
pub fn build_url(base_url: &str, path: &str, params: QueryParams<'_>) -> Result<Url> {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid URL {}: {}", raw, e)))?;

    let present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (*key, v))
        })
        .collect();
    if !present.is_empty() {
        url.query_pairs_mut().extend_pairs(present);
    }

    Ok(url)
}

/// Builder for [`RequestExecutor`].
pub struct RequestExecutorBuilder {
    base_url: String,
    credentials: CredentialResolver,
    preference: AuthHeaderPreference,
    scheme: AuthScheme,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    sink: Arc<dyn DiagnosticSink>,
    log_bodies: bool,
}

impl RequestExecutorBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: CredentialResolver::anonymous(),
            preference: AuthHeaderPreference::Auto,
            scheme: AuthScheme::Bearer,
            timeout: Duration::from_secs(15),
            transport: None,
            sink: Arc::new(TracingSink),
            log_bodies: false,
        }
    }

    pub fn credentials(mut self, credentials: CredentialResolver) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn header_preference(mut self, preference: AuthHeaderPreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Budget for each attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn log_response_bodies(mut self, enabled: bool) -> Self {
        self.log_bodies = enabled;
        self
    }

    pub fn build(self) -> Result<RequestExecutor> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        Ok(RequestExecutor {
            base_url: self.base_url,
            credentials: self.credentials,
            preference: self.preference,
            scheme: self.scheme,
            timeout: self.timeout,
            transport,
            logger: RedactingLogger::new(self.sink, self.log_bodies),
        })
    }
}
