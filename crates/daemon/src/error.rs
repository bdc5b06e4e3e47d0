// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::github::ApiError;
use crate::monitor::MonitorError;
use crate::queue::QueueError;
use crate::store::StoreError;
use crate::transport::TransportError;

/// All errors surfaced by the hubqueue service.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Record(#[from] hq_core::Error),

    #[error("queue worker has stopped\n  hint: the sync context was shut down")]
    WorkerStopped,

    #[error("hubqueued is already running (lock held on {0})\n  hint: stop the running instance first")]
    AlreadyRunning(PathBuf),

    #[error("invalid header '{0}'\n  hint: use the form 'Name: value'")]
    InvalidHeader(String),

    #[error("{0} calls are never queued\n  hint: only POST, PATCH, PUT and DELETE are replayed")]
    NotMutating(hq_core::HttpMethod),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for hubqueue operations.
pub type Result<T> = std::result::Result<T, Error>;
