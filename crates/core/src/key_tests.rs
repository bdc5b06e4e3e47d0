// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

fn key(n: u64) -> QueueKey {
    QueueKey::new(n).unwrap()
}

#[parameterized(
    one = { "1", 1 },
    nine = { "9", 9 },
    ten = { "10", 10 },
    large = { "18446744073709551615", u64::MAX },
)]
fn parse_valid(input: &str, expected: u64) {
    assert_eq!(input.parse::<QueueKey>().unwrap().value(), expected);
}

#[parameterized(
    empty = { "" },
    zero = { "0" },
    leading_zero = { "01" },
    signed = { "+1" },
    negative = { "-1" },
    alpha = { "abc" },
    word = { "last_key" },
    overflow = { "18446744073709551616" },
)]
fn parse_invalid(input: &str) {
    assert!(input.parse::<QueueKey>().is_err());
}

#[test]
fn sorts_numerically_not_lexicographically() {
    let keys = sorted_keys(["10", "9", "2", "1", "stray", "11"]);
    let values: Vec<u64> = keys.iter().map(QueueKey::value).collect();
    assert_eq!(values, vec![1, 2, 9, 10, 11]);
}

#[test]
fn next_key_on_empty_store_is_one() {
    assert_eq!(next_key(&[], None).unwrap().to_string(), "1");
}

#[test]
fn next_key_follows_max_live_key() {
    assert_eq!(next_key(&[key(1), key(3)], None).unwrap(), key(4));
}

#[test]
fn next_key_respects_high_water_mark() {
    // "3" was replayed and deleted; "3" must not be handed out again.
    assert_eq!(next_key(&[key(1), key(2)], Some(key(3))).unwrap(), key(4));
    assert_eq!(next_key(&[], Some(key(7))).unwrap(), key(8));
}

#[test]
fn next_key_overflow_is_an_error() {
    assert!(next_key(&[key(u64::MAX)], None).is_err());
}

#[test]
fn serde_uses_string_form() {
    let json = serde_json::to_string(&key(42)).unwrap();
    assert_eq!(json, "\"42\"");
    let parsed: QueueKey = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, key(42));
    assert!(serde_json::from_str::<QueueKey>("\"x\"").is_err());
}
