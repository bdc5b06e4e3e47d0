// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! hubqueue: offline-resilient write queue for the GitHub issue board.
//!
//! Calls that fail because GitHub cannot be reached are published to a
//! failure observer, persisted in a durable key-value store, and replayed in
//! their original order once a connectivity probe succeeds.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  offline   ┌─────────────────┐  push   ┌─────────────┐
//! │ GithubClient │───────────►│ FailureObserver │────────►│ WriteQueue  │
//! └──────────────┘            └─────────────────┘  drain  │  (KvStore)  │
//!                                 ▲        │     ┌───────►└─────────────┘
//!                            sync │        │     │              │ replay
//!                                 │        ▼     │              ▼
//!                           ┌─────────────────────┐      ┌─────────────┐
//!                           │ ConnectivityMonitor │      │HttpTransport│
//!                           └─────────────────────┘      └─────────────┘
//! ```

pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod github;
pub mod monitor;
pub mod queue;
pub mod store;
pub mod transport;

pub use config::Config;
pub use context::{ContextOptions, SyncContext};
pub use error::{Error, Result};
pub use github::{Delivery, GithubClient};
pub use monitor::{ConnectivityMonitor, HttpProber, ProbeHandle, ProbeResult, Prober};
pub use queue::{DrainOutcome, DrainReport, QueueState, WriteQueue};
pub use store::{KvStore, MemoryStore, RedisStore, SqliteStore};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};

#[cfg(test)]
mod test_helpers;



#[cfg(test)]
mod monitor_tests;
