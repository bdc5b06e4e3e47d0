// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed store.
//!
//! Keys are namespaced (`<namespace>:<key>`) so the queue can share a Redis
//! database with other tenants; [`KvStore::list_keys`] only ever returns keys
//! from its own namespace, with the prefix stripped. Metadata lives under a
//! sibling prefix (`<namespace>.meta:<name>`) that the record SCAN never
//! matches.

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info};

use super::{KvStore, StoreError, StoreFuture, StoreResult};

/// Number of keys requested per SCAN round trip.
const SCAN_BATCH: usize = 100;

/// Redis [`KvStore`].
pub struct RedisStore {
    url: String,
    namespace: String,
    conn: Option<MultiplexedConnection>,
}

impl RedisStore {
    /// Creates a disconnected store for `url` (e.g. `redis://127.0.0.1/`).
    pub fn new(url: impl Into<String>, namespace: impl Into<String>) -> Self {
        RedisStore {
            url: url.into(),
            namespace: namespace.into(),
            conn: None,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn meta_key(&self, name: &str) -> String {
        format!("{}.meta:{}", self.namespace, name)
    }

    fn strip_namespace<'a>(&self, full: &'a str) -> Option<&'a str> {
        full.strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
    }

    fn connection(&self) -> StoreResult<MultiplexedConnection> {
        self.conn.clone().ok_or(StoreError::NotConnected)
    }
}

impl KvStore for RedisStore {
    fn connect(&mut self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if self.conn.is_some() {
                debug!("redis store already connected");
                return Ok(());
            }
            let client = redis::Client::open(self.url.as_str())
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
            let conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
            self.conn = Some(conn);
            info!(url = %self.url, namespace = %self.namespace, "connected to redis");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            // Dropping the last handle closes the socket.
            if self.conn.take().is_some() {
                info!("disconnected from redis");
            }
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn set(&mut self, key: &str, value: &str) -> StoreFuture<'_, ()> {
        let key = self.full_key(key);
        let value = value.to_string();
        Box::pin(async move {
            let mut conn = self.connection()?;
            conn.set::<_, _, ()>(key, value).await?;
            Ok(())
        })
    }

    fn get(&mut self, key: &str) -> StoreFuture<'_, Option<String>> {
        let key = self.full_key(key);
        Box::pin(async move {
            let mut conn = self.connection()?;
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
    }

    fn delete(&mut self, key: &str) -> StoreFuture<'_, u64> {
        let key = self.full_key(key);
        Box::pin(async move {
            let mut conn = self.connection()?;
            let removed: u64 = conn.del(key).await?;
            Ok(removed)
        })
    }

    fn list_keys(&mut self) -> StoreFuture<'_, Vec<String>> {
        let pattern = self.full_key("*");
        Box::pin(async move {
            let mut conn = self.connection()?;
            let mut keys = Vec::new();
            let mut cursor: u64 = 0;

            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await?;

                keys.extend(
                    batch
                        .iter()
                        .filter_map(|k| self.strip_namespace(k))
                        .map(str::to_string),
                );

                if next == 0 {
                    break;
                }
                cursor = next;
            }

            // SCAN may return a key more than once.
            keys.sort();
            keys.dedup();
            Ok(keys)
        })
    }

    fn get_meta(&mut self, name: &str) -> StoreFuture<'_, Option<String>> {
        let key = self.meta_key(name);
        Box::pin(async move {
            let mut conn = self.connection()?;
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
    }

    fn set_meta(&mut self, name: &str, value: &str) -> StoreFuture<'_, ()> {
        let key = self.meta_key(name);
        let value = value.to_string();
        Box::pin(async move {
            let mut conn = self.connection()?;
            conn.set::<_, _, ()>(key, value).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "redis_store_tests.rs"]
mod tests;
