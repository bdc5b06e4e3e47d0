// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued request records.
//!
//! A record is the durable description of an outbound HTTP call, captured at
//! failure time with everything needed to reissue it verbatim: method, URL,
//! headers (including the bearer token in effect at capture) and the body as
//! already-serialized text.
//!
//! Records are write-once. The JSON form produced by [`QueuedRequest::to_json`]
//! is what the store holds.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// HTTP verbs a record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    /// Returns the canonical upper-case verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a request with this verb changes server state.
    ///
    /// Only mutating requests are worth replaying after an outage.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PATCH" => Ok(HttpMethod::Patch),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

/// Description of an outbound request, sufficient to reissue it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedRequest {
    pub method: HttpMethod,
    /// Absolute URL including any query string.
    pub url: String,
    /// Header names keep the casing they were captured with.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Payload serialized at capture time, stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// When the request was captured. Records written without it decode
    /// with the decode time.
    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

impl QueuedRequest {
    /// Creates a record with no headers and no body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        QueuedRequest {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            captured_at: Utc::now(),
        }
    }

    /// Adds a header, replacing any previous value under the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets an `Authorization: Bearer <token>` header.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    /// Sets the already-serialized body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether the record describes a state-changing call.
    pub fn is_mutating(&self) -> bool {
        self.method.is_mutating()
    }

    /// Looks up a header by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the record to its stored JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a record from its stored JSON form.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl fmt::Display for QueuedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
