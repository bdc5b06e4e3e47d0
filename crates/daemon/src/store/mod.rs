// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value store backing the write queue.
//!
//! Every backend follows the same discipline: nothing works until
//! [`KvStore::connect`] has succeeded, and [`KvStore::disconnect`] releases
//! the connection. Calls made while disconnected fail with
//! [`StoreError::NotConnected`]. Backends never retry internally; the caller
//! decides what a failure means.
//!
//! Besides records, a store keeps a few named metadata entries (the queue's
//! high-water mark). They are kept apart from the records so an empty key
//! listing really means an empty queue.

mod memory;
mod redis_store;
mod sqlite_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use sqlite_store::SqliteStore;

use std::future::Future;
use std::pin::Pin;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An operation was attempted before `connect()` succeeded.
    #[error("store is not connected\n  hint: call connect() before using the store")]
    NotConnected,

    /// Connecting failed.
    #[error("store connection failed: {0}")]
    ConnectionFailed(String),

    /// Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// SQLite statement failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Backend failure without a more specific type.
    #[error("store error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Persistence contract consumed by the write queue.
pub trait KvStore: Send + Sync {
    /// Opens the connection. Connecting an already-connected store is a no-op.
    fn connect(&mut self) -> StoreFuture<'_, ()>;

    /// Releases the connection. Disconnecting twice is a no-op.
    fn disconnect(&mut self) -> StoreFuture<'_, ()>;

    /// Whether `connect()` has succeeded and `disconnect()` has not run since.
    fn is_connected(&self) -> bool;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> StoreFuture<'_, ()>;

    /// Reads the value under `key`.
    fn get(&mut self, key: &str) -> StoreFuture<'_, Option<String>>;

    /// Deletes `key`, returning how many entries were removed (0 or 1).
    fn delete(&mut self, key: &str) -> StoreFuture<'_, u64>;

    /// Lists every record key, sorted. Metadata entries are not included.
    fn list_keys(&mut self) -> StoreFuture<'_, Vec<String>>;

    /// Reads a metadata entry. Metadata lives beside the records, outside
    /// the key space [`KvStore::list_keys`] reports.
    fn get_meta(&mut self, name: &str) -> StoreFuture<'_, Option<String>>;

    /// Writes a metadata entry, replacing any previous value.
    fn set_meta(&mut self, name: &str, value: &str) -> StoreFuture<'_, ()>;
}
