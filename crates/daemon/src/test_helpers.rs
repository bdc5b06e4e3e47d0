// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for daemon tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hq_core::{HandlerError, HttpMethod, QueuedRequest, Subscriber, SyncEvent};

use crate::monitor::{ProbeFuture, ProbeResult, Prober};
use crate::queue::WriteQueue;
use crate::store::MemoryStore;
use crate::transport::HttpTransport;
use crate::transport_tests::MockTransport;

pub const API: &str = "https://api.example.com";

/// A POST to `API` + `path` with a JSON body and bearer token.
pub fn post(path: &str) -> QueuedRequest {
    QueuedRequest::new(HttpMethod::Post, format!("{API}{path}"))
        .with_bearer("t0ken")
        .with_header("Content-Type", "application/json")
        .with_body(format!("{{\"path\":\"{path}\"}}"))
}

/// Opens a queue over a shared memory store.
pub async fn open_queue(store: &MemoryStore, transport: &Arc<MockTransport>) -> WriteQueue {
    let transport: Arc<dyn HttpTransport> = transport.clone();
    WriteQueue::open(Box::new(store.clone()), transport)
        .await
        .unwrap()
}

/// Record keys in the store.
pub fn stored_keys(store: &MemoryStore) -> Vec<String> {
    store.snapshot().into_keys().collect()
}

/// Bus subscriber that records every event it sees.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber(&self) -> Subscriber {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: &SyncEvent| -> Result<(), HandlerError> {
            events.lock().unwrap().push(event.clone());
            Ok(())
        })
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(SyncEvent::kind).collect()
    }
}

/// Prober that replays a script of results, then repeats the last one.
pub struct MockProber {
    script: Mutex<VecDeque<ProbeStep>>,
    last: Mutex<ProbeStep>,
    probes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// One scripted probe.
#[derive(Debug, Clone)]
pub enum ProbeStep {
    Reply(u16),
    /// Never answers within any reasonable timeout.
    Hang,
}

impl MockProber {
    pub fn new(steps: impl IntoIterator<Item = ProbeStep>) -> Self {
        let script: VecDeque<ProbeStep> = steps.into_iter().collect();
        let last = script.back().cloned().unwrap_or(ProbeStep::Reply(200));
        MockProber {
            script: Mutex::new(script),
            last: Mutex::new(last),
            probes: Default::default(),
            in_flight: Default::default(),
            max_in_flight: Default::default(),
        }
    }

    /// `failures` failing probes, then success.
    pub fn failing(failures: usize) -> Self {
        let mut steps = vec![ProbeStep::Reply(500); failures];
        steps.push(ProbeStep::Reply(200));
        Self::new(steps)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Prober for MockProber {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            self.probes.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let step = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.last.lock().unwrap().clone());

            // Decrement even when the timeout drops this future mid-sleep.
            struct Leave<'a>(&'a AtomicUsize);
            impl Drop for Leave<'_> {
                fn drop(&mut self) {
                    self.0.fetch_sub(1, Ordering::SeqCst);
                }
            }
            let _leave = Leave(&self.in_flight);

            match step {
                ProbeStep::Reply(status) => {
                    ProbeResult::new(status, format!("status {status}"))
                }
                ProbeStep::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    ProbeResult::new(200, "late")
                }
            }
        })
    }
}
