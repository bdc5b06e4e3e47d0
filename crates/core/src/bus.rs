// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Failure observer: an in-process publish/subscribe hub for [`SyncEvent`]s.
//!
//! One observer is created at startup and shared by reference. Delivery is
//! synchronous and in registration order. Each handler is isolated: an error
//! or a panic in one handler is logged and the remaining handlers still run.
//!
//! Delivery is serialized. Only one thread dispatches at a time; events
//! published while a dispatch is running (from another thread, or from inside
//! a handler) are appended to a pending list and delivered by the active
//! dispatcher once the current event has reached every handler. Handlers
//! therefore never see two events interleaved, and a handler may publish
//! without deadlocking.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::event::SyncEvent;

/// Error returned by a handler. Logged by the observer, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A subscriber callback.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &SyncEvent) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&SyncEvent) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, event: &SyncEvent) -> Result<(), HandlerError> {
        self(event)
    }
}

/// Shared handle to a registered handler. Identity is the allocation.
pub type Subscriber = Arc<dyn EventHandler>;

#[derive(Default)]
struct DispatchState {
    pending: VecDeque<SyncEvent>,
    active: bool,
}

/// Process-wide event hub.
#[derive(Default)]
pub struct FailureObserver {
    subscribers: Mutex<Vec<Subscriber>>,
    dispatch: Mutex<DispatchState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FailureObserver {
    /// Creates an observer with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Registering the same handler twice delivers
    /// every event to it twice.
    pub fn subscribe(&self, handler: Subscriber) {
        lock(&self.subscribers).push(handler);
    }

    /// Removes every registration of `handler`. No-op if it is not registered.
    pub fn unsubscribe(&self, handler: &Subscriber) {
        lock(&self.subscribers).retain(|s| !std::ptr::addr_eq(Arc::as_ptr(s), Arc::as_ptr(handler)));
    }

    /// Number of registrations.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Publishes an event to every handler.
    pub fn notify(&self, event: SyncEvent) {
        {
            let mut state = lock(&self.dispatch);
            state.pending.push_back(event);
            if state.active {
                return;
            }
            state.active = true;
        }

        loop {
            let next = {
                let mut state = lock(&self.dispatch);
                match state.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        state.active = false;
                        return;
                    }
                }
            };
            self.deliver(&next);
        }
    }

    fn deliver(&self, event: &SyncEvent) {
        // Snapshot so handlers can subscribe/unsubscribe while we iterate.
        let snapshot: Vec<Subscriber> = lock(&self.subscribers).clone();
        debug!(event = event.kind(), subscribers = snapshot.len(), "dispatching event");

        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(event = event.kind(), "event handler failed: {}", e);
                }
                Err(_) => {
                    error!(event = event.kind(), "event handler panicked");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
