// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub REST boundary.
//!
//! Every call is first described as a [`QueuedRequest`] so that, when the
//! server cannot be reached, the exact call can be handed to the failure
//! observer and replayed later. Failures are classified here:
//!
//! - no response, or a 502/503/504 gateway status: publishes Offline. A
//!   mutating call then reports [`Delivery::SavedOffline`]; a read fails.
//!   With [`PushAcks`] attached, the client first waits for the write queue
//!   to confirm the call was stored and fails with [`ApiError::NotQueued`]
//!   if it was not.
//! - any other non-2xx status: an application error, returned as-is and
//!   never queued.
//! - a request that cannot be built: publishes UnknownError.

use std::sync::Arc;

use hq_core::{FailureObserver, HttpMethod, QueuedRequest, SyncEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::queue::PushAcks;
use crate::transport::{HttpResponse, HttpTransport};

/// Media type GitHub recommends for the REST API.
pub const ACCEPT: &str = "application/vnd.github+json";

/// Error type for GitHub calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server could not be reached and the call was not queued.
    #[error("{context}: offline ({message})")]
    Offline { context: String, message: String },

    /// The server could not be reached and the write queue failed to store
    /// the call. Nothing will replay it.
    #[error("{context}: offline and not queued ({message})")]
    NotQueued { context: String, message: String },

    /// The server answered with an error status.
    #[error("{context}: github returned {status} {reason}")]
    Api {
        context: String,
        status: u16,
        reason: String,
        body: String,
    },

    /// The request could not be built or sent.
    #[error("{context}: {message}")]
    Unknown { context: String, message: String },

    /// A success response whose body did not parse.
    #[error("{context}: unexpected response body: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for GitHub calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// How a mutating call was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The server accepted it.
    Sent(HttpResponse),
    /// The server was unreachable; the call was handed to the write queue
    /// and will be replayed when connectivity returns.
    SavedOffline,
}

impl Delivery {
    pub fn is_saved_offline(&self) -> bool {
        matches!(self, Delivery::SavedOffline)
    }
}

/// Issue state accepted by the update endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// Body of a create-issue call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Body of an update-issue call. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
}

#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    login: String,
}

/// Client for the GitHub issue endpoints the board writes to.
pub struct GithubClient {
    transport: Arc<dyn HttpTransport>,
    observer: Arc<FailureObserver>,
    api_base: String,
    user_agent: String,
    acks: Option<Arc<PushAcks>>,
}

impl GithubClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        observer: Arc<FailureObserver>,
        api_base: &str,
        user_agent: &str,
    ) -> Self {
        GithubClient {
            transport,
            observer,
            api_base: api_base.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            acks: None,
        }
    }

    /// Waits for the write queue's receipt before reporting a mutating call
    /// as saved offline.
    pub fn with_push_acks(mut self, acks: Arc<PushAcks>) -> Self {
        self.acks = Some(acks);
        self
    }

    /// Describes an authenticated call to `path` (which starts with `/`).
    pub fn request(&self, method: HttpMethod, path: &str, token: &str) -> QueuedRequest {
        QueuedRequest::new(method, format!("{}{}", self.api_base, path))
            .with_header("Accept", ACCEPT)
            .with_header("User-Agent", self.user_agent.as_str())
            .with_header("Content-Type", "application/json")
            .with_bearer(token)
    }

    /// Executes a described call and classifies the outcome.
    pub async fn execute(&self, request: QueuedRequest, context: &str) -> ApiResult<Delivery> {
        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => Ok(Delivery::Sent(response)),
            Ok(response) if response.is_gateway_failure() => {
                let message = format!("gateway returned {}", response.status);
                self.went_offline(request, context, message).await
            }
            Ok(response) => {
                debug!(status = response.status, request = %request, "github rejected call");
                Err(ApiError::Api {
                    context: context.to_string(),
                    status: response.status,
                    reason: response.reason,
                    body: response.body,
                })
            }
            Err(e) if e.is_network() => {
                self.went_offline(request, context, e.to_string()).await
            }
            Err(e) => {
                let message = e.to_string();
                self.observer
                    .notify(SyncEvent::unknown_error(context, message.as_str()));
                Err(ApiError::Unknown {
                    context: context.to_string(),
                    message,
                })
            }
        }
    }

    async fn went_offline(
        &self,
        request: QueuedRequest,
        context: &str,
        message: String,
    ) -> ApiResult<Delivery> {
        let mutating = request.is_mutating();
        warn!(request = %request, reason = %message, "github unreachable");
        let receipt = match &self.acks {
            Some(acks) if mutating => Some(acks.register(&request)),
            _ => None,
        };
        self.observer
            .notify(SyncEvent::offline(message.as_str(), request));

        if !mutating {
            return Err(ApiError::Offline {
                context: context.to_string(),
                message,
            });
        }
        let Some(receipt) = receipt else {
            return Ok(Delivery::SavedOffline);
        };
        match receipt.await {
            Ok(Ok(key)) => {
                debug!(key = %key, "offline call stored for replay");
                Ok(Delivery::SavedOffline)
            }
            Ok(Err(reason)) => Err(ApiError::NotQueued {
                context: context.to_string(),
                message: reason,
            }),
            Err(_) => Err(ApiError::NotQueued {
                context: context.to_string(),
                message: "write queue is not running".to_string(),
            }),
        }
    }

    fn with_json<T: Serialize>(
        &self,
        request: QueuedRequest,
        body: &T,
        context: &str,
    ) -> ApiResult<QueuedRequest> {
        match serde_json::to_string(body) {
            Ok(json) => Ok(request.with_body(json)),
            Err(e) => {
                self.observer
                    .notify(SyncEvent::unknown_error(context, e.to_string()));
                Err(ApiError::Unknown {
                    context: context.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// `POST /repos/{owner}/{repo}/issues`
    pub async fn create_issue(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        issue: &NewIssue,
    ) -> ApiResult<Delivery> {
        let context = "Failed to create issue";
        let request = self.request(
            HttpMethod::Post,
            &format!("/repos/{owner}/{repo}/issues"),
            token,
        );
        let request = self.with_json(request, issue, context)?;
        self.execute(request, context).await
    }

    /// `PATCH /repos/{owner}/{repo}/issues/{number}`
    pub async fn update_issue(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        number: u64,
        update: &IssueUpdate,
    ) -> ApiResult<Delivery> {
        let context = "Failed to update issue";
        let request = self.request(
            HttpMethod::Patch,
            &format!("/repos/{owner}/{repo}/issues/{number}"),
            token,
        );
        let request = self.with_json(request, update, context)?;
        self.execute(request, context).await
    }

    /// Closes an issue through the update endpoint.
    pub async fn close_issue(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> ApiResult<Delivery> {
        let update = IssueUpdate {
            state: Some(IssueState::Closed),
            ..IssueUpdate::default()
        };
        self.update_issue(token, owner, repo, number, &update).await
    }

    /// `POST /repos/{owner}/{repo}/issues/{number}/labels`
    pub async fn add_labels(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> ApiResult<Delivery> {
        let context = "Failed to add labels";
        let request = self.request(
            HttpMethod::Post,
            &format!("/repos/{owner}/{repo}/issues/{number}/labels"),
            token,
        );
        let request = self.with_json(request, &serde_json::json!({ "labels": labels }), context)?;
        self.execute(request, context).await
    }

    /// `GET /user`. Reads are never queued; offline is an error here.
    pub async fn authenticated_user(&self, token: &str) -> ApiResult<String> {
        let context = "Failed to get authenticated user";
        let request = self.request(HttpMethod::Get, "/user", token);
        match self.execute(request, context).await? {
            Delivery::Sent(response) => serde_json::from_str::<AuthenticatedUser>(&response.body)
                .map(|user| user.login)
                .map_err(|source| ApiError::Decode {
                    context: context.to_string(),
                    source,
                }),
            Delivery::SavedOffline => Err(ApiError::Offline {
                context: context.to_string(),
                message: "read calls are not queued".to_string(),
            }),
        }
    }
}
