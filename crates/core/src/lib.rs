// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! hq-core: Shared types for the hubqueue offline write queue
//!
//! This crate provides the runtime-free pieces used by the `hubqueued`
//! service: the queued request record and its codec, queue keys, the
//! failure-observer events and the observer itself.

pub mod bus;
pub mod error;
pub mod event;
pub mod key;
pub mod record;

pub use bus::{EventHandler, FailureObserver, HandlerError, Subscriber};
pub use error::{Error, Result};
pub use event::SyncEvent;
pub use key::{next_key, sorted_keys, QueueKey, HIGH_WATER_KEY};
pub use record::{HttpMethod, QueuedRequest};
