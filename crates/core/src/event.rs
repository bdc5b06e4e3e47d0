// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Events carried by the failure observer.
//!
//! Any component that talks HTTP publishes these; the write queue and the
//! connectivity monitor consume them. The JSON form is tagged by `type` so
//! collaborators outside the process (the UI over IPC) can read them.

use serde::{Deserialize, Serialize};

use crate::record::QueuedRequest;

/// A failure-observer event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A call failed because the origin server could not be reached.
    ///
    /// `config` describes the failed call so it can be replayed.
    Offline {
        message: String,
        config: QueuedRequest,
    },

    /// Connectivity has been reestablished.
    Sync,

    /// A non-network failure. Informational only, never queued.
    UnknownError { message: String, error: String },

    /// Any event type this build does not know. Subscribers ignore it.
    #[serde(other)]
    Unrecognized,
}

impl SyncEvent {
    /// Creates an Offline event.
    pub fn offline(message: impl Into<String>, config: QueuedRequest) -> Self {
        SyncEvent::Offline {
            message: message.into(),
            config,
        }
    }

    /// Creates a Sync event.
    pub fn sync() -> Self {
        SyncEvent::Sync
    }

    /// Creates an UnknownError event.
    pub fn unknown_error(message: impl Into<String>, error: impl Into<String>) -> Self {
        SyncEvent::UnknownError {
            message: message.into(),
            error: error.into(),
        }
    }

    /// The `type` tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::Offline { .. } => "offline",
            SyncEvent::Sync => "sync",
            SyncEvent::UnknownError { .. } => "unknown_error",
            SyncEvent::Unrecognized => "unrecognized",
        }
    }

    /// Serializes the event to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the event from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
