// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport abstraction.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP calls through reqwest for production
//! - Mock transports for unit testing
//!
//! The transport also owns failure classification. A call either produced a
//! response (any status) or failed before one arrived; only the latter, plus
//! gateway statuses, count as "offline".

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use hq_core::QueuedRequest;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No response within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Could not open a connection (DNS, refused, unreachable).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection dropped or the exchange failed mid-flight.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The request itself is malformed (bad URL, bad header). Not a network
    /// condition; retrying cannot help.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    Setup(String),
}

impl TransportError {
    /// Whether the failure means the origin server could not be reached.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout(_)
                | TransportError::ConnectionFailed(_)
                | TransportError::RequestFailed(_)
        )
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A response that arrived, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, or empty.
    pub reason: String,
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with the canonical reason phrase and no body.
    pub fn new(status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        HttpResponse {
            status,
            reason,
            body: String::new(),
        }
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 502, 503 and 504 come from an intermediary that could not reach the
    /// origin, so they are treated like no response at all.
    pub fn is_gateway_failure(&self) -> bool {
        matches!(self.status, 502..=504)
    }
}

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = TransportResult<HttpResponse>> + Send + 'a>>;

/// Transport trait for issuing HTTP requests described by a record.
pub trait HttpTransport: Send + Sync {
    /// Sends the request exactly as described: method, URL, headers, body.
    fn send(&self, request: &QueuedRequest) -> TransportFuture<'_>;
}

/// HTTP transport implementation using reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration, user_agent: &str) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(ReqwestTransport { client })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::ConnectionFailed(err.to_string())
    } else {
        TransportError::RequestFailed(err.to_string())
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &QueuedRequest) -> TransportFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

            let mut builder = self.client.request(method, request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(classify)?;
            let status = response.status();
            // A body that fails to arrive does not change the outcome.
            let body = response.text().await.unwrap_or_default();

            Ok(HttpResponse {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            })
        })
    }
}
