// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Volatile in-process store.
//!
//! Clones share the same map, so a test can keep a handle for inspection
//! after handing the store to the queue. Contents are lost on exit.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{KvStore, StoreError, StoreFuture, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    meta: BTreeMap<String, String>,
    connected: bool,
    /// When set, every operation fails as if the backend went away.
    unavailable: bool,
}

/// In-memory [`KvStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty, disconnected store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates the backend becoming unreachable (or reachable again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Copy of every record, bypassing the connection check.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().entries.clone()
    }

    /// Copy of every metadata entry, bypassing the connection check.
    pub fn meta_snapshot(&self) -> BTreeMap<String, String> {
        self.lock().meta.clone()
    }

    fn with_connected<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> StoreResult<T> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(StoreError::Backend("memory store unavailable".to_string()));
        }
        if !inner.connected {
            return Err(StoreError::NotConnected);
        }
        Ok(f(&mut inner))
    }
}

impl KvStore for MemoryStore {
    fn connect(&mut self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.lock();
            if inner.unavailable {
                return Err(StoreError::ConnectionFailed(
                    "memory store unavailable".to_string(),
                ));
            }
            inner.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.lock().connected = false;
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn set(&mut self, key: &str, value: &str) -> StoreFuture<'_, ()> {
        let key = key.to_string();
        let value = value.to_string();
        Box::pin(async move {
            self.with_connected(|inner| {
                inner.entries.insert(key, value);
            })
        })
    }

    fn get(&mut self, key: &str) -> StoreFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move { self.with_connected(|inner| inner.entries.get(&key).cloned()) })
    }

    fn delete(&mut self, key: &str) -> StoreFuture<'_, u64> {
        let key = key.to_string();
        Box::pin(async move {
            self.with_connected(|inner| u64::from(inner.entries.remove(&key).is_some()))
        })
    }

    fn list_keys(&mut self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move { self.with_connected(|inner| inner.entries.keys().cloned().collect()) })
    }

    fn get_meta(&mut self, name: &str) -> StoreFuture<'_, Option<String>> {
        let name = name.to_string();
        Box::pin(async move { self.with_connected(|inner| inner.meta.get(&name).cloned()) })
    }

    fn set_meta(&mut self, name: &str, value: &str) -> StoreFuture<'_, ()> {
        let name = name.to_string();
        let value = value.to_string();
        Box::pin(async move {
            self.with_connected(|inner| {
                inner.meta.insert(name, value);
            })
        })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
