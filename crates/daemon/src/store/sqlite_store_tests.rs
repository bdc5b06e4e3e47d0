// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;

#[tokio::test]
async fn operations_fail_before_connect() {
    let temp = TempDir::new().unwrap();
    let mut store = SqliteStore::new(&temp.path().join("queue.db"));

    assert!(matches!(
        store.set("1", "x").await,
        Err(StoreError::NotConnected)
    ));
    assert!(matches!(
        store.list_keys().await,
        Err(StoreError::NotConnected)
    ));
}

#[tokio::test]
async fn set_get_delete_list() {
    let temp = TempDir::new().unwrap();
    let mut store = SqliteStore::new(&temp.path().join("queue.db"));
    store.connect().await.unwrap();

    store.set("1", "first").await.unwrap();
    store.set("2", "second").await.unwrap();
    store.set("1", "replaced").await.unwrap();

    assert_eq!(store.get("1").await.unwrap().as_deref(), Some("replaced"));
    assert_eq!(store.get("3").await.unwrap(), None);
    assert_eq!(store.list_keys().await.unwrap(), vec!["1", "2"]);

    assert_eq!(store.delete("2").await.unwrap(), 1);
    assert_eq!(store.delete("2").await.unwrap(), 0);
    assert_eq!(store.list_keys().await.unwrap(), vec!["1"]);
}

#[tokio::test]
async fn contents_survive_reconnect() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("queue.db");

    {
        let mut store = SqliteStore::new(&path);
        store.connect().await.unwrap();
        store.set("7", "{\"method\":\"POST\"}").await.unwrap();
        store.disconnect().await.unwrap();
        assert!(!store.is_connected());
    }

    let mut store = SqliteStore::new(&path);
    store.connect().await.unwrap();
    assert_eq!(
        store.get("7").await.unwrap().as_deref(),
        Some("{\"method\":\"POST\"}")
    );
}

#[tokio::test]
async fn connect_twice_is_noop() {
    let temp = TempDir::new().unwrap();
    let mut store = SqliteStore::new(&temp.path().join("queue.db"));
    store.connect().await.unwrap();
    store.set("1", "a").await.unwrap();
    store.connect().await.unwrap();
    assert_eq!(store.get("1").await.unwrap().as_deref(), Some("a"));
}

#[tokio::test]
async fn metadata_survives_reconnect_and_is_not_listed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("queue.db");

    {
        let mut store = SqliteStore::new(&path);
        store.connect().await.unwrap();
        store.set("3", "record").await.unwrap();
        store.set_meta("last_key", "2").await.unwrap();
        store.set_meta("last_key", "3").await.unwrap();
        store.delete("3").await.unwrap();
        store.disconnect().await.unwrap();
    }

    let mut store = SqliteStore::new(&path);
    store.connect().await.unwrap();
    assert!(store.list_keys().await.unwrap().is_empty());
    assert_eq!(store.get_meta("last_key").await.unwrap().as_deref(), Some("3"));
    assert_eq!(store.get("last_key").await.unwrap(), None);
}
