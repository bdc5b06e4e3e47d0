// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for hq-core operations.

use thiserror::Error;

/// All possible errors that can occur in hq-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid queue key: '{0}'\n  hint: keys are positive decimal integers without leading zeros")]
    InvalidKey(String),

    #[error("invalid HTTP method: '{0}'\n  hint: valid methods are: GET, POST, PATCH, PUT, DELETE")]
    InvalidMethod(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for hq-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
