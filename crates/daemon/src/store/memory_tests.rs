// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[tokio::test]
async fn operations_fail_before_connect() {
    let mut store = MemoryStore::new();
    assert!(!store.is_connected());

    let err = store.set("1", "x").await.unwrap_err();
    assert!(matches!(err, StoreError::NotConnected));
    assert!(matches!(store.list_keys().await, Err(StoreError::NotConnected)));
}

#[tokio::test]
async fn set_get_delete_list() {
    let mut store = MemoryStore::new();
    store.connect().await.unwrap();

    store.set("2", "b").await.unwrap();
    store.set("1", "a").await.unwrap();

    assert_eq!(store.get("1").await.unwrap().as_deref(), Some("a"));
    assert_eq!(store.get("9").await.unwrap(), None);
    assert_eq!(store.list_keys().await.unwrap(), vec!["1", "2"]);

    assert_eq!(store.delete("1").await.unwrap(), 1);
    assert_eq!(store.delete("1").await.unwrap(), 0);
    assert_eq!(store.list_keys().await.unwrap(), vec!["2"]);
}

#[tokio::test]
async fn clones_share_contents() {
    let mut store = MemoryStore::new();
    let observer = store.clone();
    store.connect().await.unwrap();
    store.set("1", "a").await.unwrap();

    assert_eq!(observer.snapshot().get("1").map(String::as_str), Some("a"));
}

#[tokio::test]
async fn disconnect_then_use_fails() {
    let mut store = MemoryStore::new();
    store.connect().await.unwrap();
    store.disconnect().await.unwrap();
    store.disconnect().await.unwrap();

    assert!(matches!(store.get("1").await, Err(StoreError::NotConnected)));
}

#[tokio::test]
async fn unavailable_backend_fails_loudly() {
    let mut store = MemoryStore::new();
    store.set_unavailable(true);
    assert!(matches!(
        store.connect().await,
        Err(StoreError::ConnectionFailed(_))
    ));

    store.set_unavailable(false);
    store.connect().await.unwrap();
    store.set_unavailable(true);
    assert!(matches!(store.list_keys().await, Err(StoreError::Backend(_))));
}

#[tokio::test]
async fn metadata_is_kept_apart_from_records() {
    let mut store = MemoryStore::new();
    assert!(matches!(
        store.get_meta("last_key").await,
        Err(StoreError::NotConnected)
    ));
    store.connect().await.unwrap();

    store.set("1", "a").await.unwrap();
    store.set_meta("last_key", "1").await.unwrap();
    store.delete("1").await.unwrap();

    assert!(store.list_keys().await.unwrap().is_empty());
    assert!(store.snapshot().is_empty());
    assert_eq!(store.get_meta("last_key").await.unwrap().as_deref(), Some("1"));
    assert_eq!(store.get("last_key").await.unwrap(), None);
    assert_eq!(store.get_meta("missing").await.unwrap(), None);
}
