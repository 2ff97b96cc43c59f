//! YuiHub Client Library
//!
//! An authenticated HTTP client for the YuiHub knowledge service. Every
//! call goes through a [`RequestExecutor`] which:
//!
//! - resolves the API key fresh for each call (secure store first, then
//!   the configured fallback),
//! - attaches it under exactly one header (`Authorization` or
//!   `x-yuihub-token`),
//! - bounds each attempt by a timeout and cancels it on expiry,
//! - when the header preference is `auto`, retries once with the other
//!   header after a 401 or 403,
//! - logs every attempt with credentials masked.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use yuihub_client::{RequestExecutor, YuiHubClient};
//! use yuihub_core::{CredentialCache, CredentialResolver, Secret};
//!
//! #[tokio::main]
//! async fn main() -> yuihub_client::Result<()> {
//!     let cache = Arc::new(CredentialCache::with_token(Secret::new("abc123")));
//!     let executor = RequestExecutor::builder("http://localhost:8787")
//!         .credentials(CredentialResolver::new(cache, None))
//!         .build()?;
//!     let client = YuiHubClient::new(executor);
//!
//!     println!("{}", client.health().await?.summary());
//!     for hit in client.search("design", Some(5)).await?.hits {
//!         println!("{}", hit.label());
//!     }
//!     Ok(())
//! }
//! ```

mod api;
pub mod error;
pub mod executor;
pub mod failover;
pub mod header;
pub mod redact;
pub mod transport;
pub mod types;

pub use api::YuiHubClient;
pub use error::{ClientError, Result};
pub use executor::{RequestExecutor, RequestExecutorBuilder};
pub use header::{HeaderChoice, HeaderSet};
pub use redact::{DiagnosticSink, MemorySink, RedactingLogger, TracingSink};
pub use transport::{HttpTransport, OutgoingRequest, RawResponse, Transport};
pub use types::{Health, SaveRequest, SavedNote, SearchHit, SearchResponse};
