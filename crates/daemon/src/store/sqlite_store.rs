// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed store for single-machine installs without Redis.
//!
//! Statements run on tokio's blocking pool so the async thread never waits
//! on disk I/O.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{KvStore, StoreError, StoreFuture, StoreResult};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS meta (
    name TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);";

/// SQLite [`KvStore`].
pub struct SqliteStore {
    path: PathBuf,
    conn: Option<Arc<Mutex<Connection>>>,
}

impl SqliteStore {
    /// Creates a disconnected store for the database file at `path`.
    pub fn new(path: &Path) -> Self {
        SqliteStore {
            path: path.to_path_buf(),
            conn: None,
        }
    }

    /// Runs `f` against the open connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone().ok_or(StoreError::NotConnected)?;
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("sqlite worker failed: {e}")))?
    }
}

fn open(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        }
    }

    let conn = Connection::open(path).map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = FULL;
         PRAGMA busy_timeout = 5000;",
    )?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

impl KvStore for SqliteStore {
    fn connect(&mut self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if self.conn.is_some() {
                return Ok(());
            }
            let path = self.path.clone();
            let conn = tokio::task::spawn_blocking(move || open(&path))
                .await
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))??;
            self.conn = Some(Arc::new(Mutex::new(conn)));
            info!(path = %self.path.display(), "opened sqlite store");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if self.conn.take().is_some() {
                info!(path = %self.path.display(), "closed sqlite store");
            }
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn set(&mut self, key: &str, value: &str) -> StoreFuture<'_, ()> {
        let key = key.to_string();
        let value = value.to_string();
        Box::pin(async move {
            self.with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )
                .map(|_| ())
            })
            .await
        })
    }

    fn get(&mut self, key: &str) -> StoreFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move {
            self.with_conn(move |conn| {
                conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
            })
            .await
        })
    }

    fn delete(&mut self, key: &str) -> StoreFuture<'_, u64> {
        let key = key.to_string();
        Box::pin(async move {
            self.with_conn(move |conn| {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                    .map(|n| n as u64)
            })
            .await
        })
    }

    fn list_keys(&mut self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(keys)
            })
            .await
        })
    }

    fn get_meta(&mut self, name: &str) -> StoreFuture<'_, Option<String>> {
        let name = name.to_string();
        Box::pin(async move {
            self.with_conn(move |conn| {
                conn.query_row("SELECT value FROM meta WHERE name = ?1", params![name], |row| {
                    row.get(0)
                })
                .optional()
            })
            .await
        })
    }

    fn set_meta(&mut self, name: &str, value: &str) -> StoreFuture<'_, ()> {
        let name = name.to_string();
        let value = value.to_string();
        Box::pin(async move {
            self.with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO meta (name, value) VALUES (?1, ?2)
                     ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                    params![name, value],
                )
                .map(|_| ())
            })
            .await
        })
    }
}

#[cfg(test)]
#[path = "sqlite_store_tests.rs"]
mod tests;
