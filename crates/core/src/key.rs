// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue keys.
//!
//! Records are stored under decimal-integer keys starting at `"1"`. The key
//! doubles as the sequence number: replay order is ascending numeric order,
//! so `"10"` sorts after `"9"`.
//!
//! Keys are never reused. The next key is one past the larger of the highest
//! live key and the persisted high-water mark, so deleting the newest record
//! does not hand its key to the next push.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the store metadata entry holding the highest key ever issued.
///
/// Stored beside the records, never among them.
pub const HIGH_WATER_KEY: &str = "last_key";

/// Sequence number of a queued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueKey(u64);

impl QueueKey {
    /// The key of the first record in an empty store.
    pub const FIRST: QueueKey = QueueKey(1);

    /// Creates a key from its numeric value. Zero is not a valid key.
    pub fn new(value: u64) -> Result<Self> {
        if value == 0 {
            return Err(Error::InvalidKey("0".to_string()));
        }
        Ok(QueueKey(value))
    }

    /// Returns the numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the key that follows this one.
    pub fn next(&self) -> Result<Self> {
        self.0
            .checked_add(1)
            .map(QueueKey)
            .ok_or_else(|| Error::InvalidKey(format!("{} + 1 overflows", self.0)))
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueKey {
    type Err = Error;

    /// Accepts canonical decimal only: no sign, no leading zeros.
    fn from_str(s: &str) -> Result<Self> {
        let canonical = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && !s.starts_with('0');
        if !canonical {
            return Err(Error::InvalidKey(s.to_string()));
        }
        s.parse::<u64>()
            .map(QueueKey)
            .map_err(|_| Error::InvalidKey(s.to_string()))
    }
}

impl TryFrom<String> for QueueKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<QueueKey> for String {
    fn from(key: QueueKey) -> Self {
        key.to_string()
    }
}

/// Parses a raw store listing into record keys in replay order.
///
/// Entries that are not record keys (such as [`HIGH_WATER_KEY`]) are skipped.
pub fn sorted_keys<I, S>(raw: I) -> Vec<QueueKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keys: Vec<QueueKey> = raw
        .into_iter()
        .filter_map(|k| k.as_ref().parse().ok())
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Computes the key for the next push.
pub fn next_key(live: &[QueueKey], high_water: Option<QueueKey>) -> Result<QueueKey> {
    let max_live = live.iter().max().copied();
    match max_live.max(high_water) {
        Some(max) => max.next(),
        None => Ok(QueueKey::FIRST),
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
