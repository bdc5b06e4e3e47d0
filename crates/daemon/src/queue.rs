// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable write queue.
//!
//! Mutating requests that could not reach the server are stored under
//! monotonically increasing numeric keys and replayed in key order once
//! connectivity returns. A record is deleted only after its replay got a 2xx;
//! anything else leaves it in place for the next pass, so delivery is
//! at-least-once.
//!
//! The store sits behind an async mutex. A push holds it for the whole
//! list-compute-write sequence, so two pushes can never pick the same key. A
//! drain pass takes it only around individual store calls and never while a
//! request is on the wire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use hq_core::{next_key, sorted_keys, QueueKey, QueuedRequest, HIGH_WATER_KEY};
use tokio::sync::{oneshot, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::store::{KvStore, StoreError};
use crate::transport::HttpTransport;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("record error: {0}")]
    Record(#[from] hq_core::Error),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Tally of one drain (possibly several back-to-back passes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Keys seen at the start of each pass.
    pub attempted: usize,
    /// Records replayed with a 2xx and deleted.
    pub replayed: usize,
    /// Records left in place (failed replay or undecodable).
    pub retained: usize,
    /// Retained records whose replay hit a network failure.
    pub network_failures: usize,
}

impl DrainReport {
    fn absorb(&mut self, other: DrainReport) {
        self.attempted += other.attempted;
        self.replayed += other.replayed;
        self.retained += other.retained;
        self.network_failures += other.network_failures;
    }
}

/// What a call to [`WriteQueue::handle_synchronization`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    /// A drain was already running; it will make one more pass.
    Coalesced,
}

/// Observable queue state for UIs and the status command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueState {
    pub pending: usize,
    pub draining: bool,
    pub last_drain: Option<DrainReport>,
    pub last_drain_at: Option<DateTime<Utc>>,
    /// Pushes that could not be stored since the queue opened.
    pub failed_pushes: u64,
    pub last_push_error: Option<String>,
}

/// A stored record as listed by [`WriteQueue::entries`].
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub key: QueueKey,
    /// `None` when the stored payload does not decode.
    pub request: Option<QueuedRequest>,
}

/// Outcome of a push as reported to whoever published the failure.
pub type PushReceipt = Result<QueueKey, String>;

/// Publishers waiting to learn whether their Offline event was stored.
///
/// A publisher registers its request before publishing. The queue handler
/// takes the matching sender when the event reaches it and hands it to the
/// worker along with the push. Closing drops every waiting sender, so a
/// waiter hears "not stored" rather than nothing once the queue is gone.
#[derive(Debug, Default)]
pub struct PushAcks {
    state: StdMutex<AckState>,
}

#[derive(Debug, Default)]
struct AckState {
    waiting: Vec<(QueuedRequest, oneshot::Sender<PushReceipt>)>,
    closed: bool,
}

impl PushAcks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AckState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts waiting for the push of `request`.
    pub fn register(&self, request: &QueuedRequest) -> oneshot::Receiver<PushReceipt> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();
        // After close the sender is dropped here and the receiver errors.
        if !state.closed {
            state.waiting.push((request.clone(), tx));
        }
        rx
    }

    /// Removes the oldest waiter for `request`, if any.
    pub fn take(&self, request: &QueuedRequest) -> Option<oneshot::Sender<PushReceipt>> {
        let mut state = self.lock();
        let pos = state.waiting.iter().position(|(r, _)| r == request)?;
        Some(state.waiting.remove(pos).1)
    }

    /// Drops every waiter and refuses new ones.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.waiting.clear();
    }

    /// Number of publishers still waiting.
    pub fn waiting(&self) -> usize {
        self.lock().waiting.len()
    }
}

/// Ownership of the draining flag. Clears it on drop unless released.
struct DrainLease<'a> {
    flag: &'a AtomicBool,
    held: bool,
}

impl<'a> DrainLease<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainLease { flag, held: true })
    }

    fn release(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.held = false;
    }

    fn reacquire(&mut self) -> bool {
        self.held = self
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.held
    }
}

impl Drop for DrainLease<'_> {
    fn drop(&mut self) {
        if self.held {
            self.flag.store(false, Ordering::Release);
        }
    }
}

/// The write queue.
pub struct WriteQueue {
    store: Mutex<Box<dyn KvStore>>,
    transport: Arc<dyn HttpTransport>,
    draining: AtomicBool,
    rerun: AtomicBool,
    state: watch::Sender<QueueState>,
}

impl WriteQueue {
    /// Connects `store` and wraps it in a queue that replays through
    /// `transport`.
    pub async fn open(
        mut store: Box<dyn KvStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> QueueResult<Self> {
        store.connect().await?;
        let pending = sorted_keys(store.list_keys().await?).len();
        if pending > 0 {
            info!(pending, "write queue opened with stored records");
        }

        let (state, _) = watch::channel(QueueState {
            pending,
            ..QueueState::default()
        });
        Ok(WriteQueue {
            store: Mutex::new(store),
            transport,
            draining: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
            state,
        })
    }

    /// Disconnects the store. Waits for any store call in progress.
    pub async fn close(&self) -> QueueResult<()> {
        self.store.lock().await.disconnect().await?;
        Ok(())
    }

    /// Receiver for queue state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<QueueState> {
        self.state.subscribe()
    }

    /// Current queue state.
    pub fn state(&self) -> QueueState {
        self.state.borrow().clone()
    }

    /// Persists `request` under the next key and returns that key.
    ///
    /// A failure is also recorded on the queue state, since the publisher of
    /// the Offline event may not be the one awaiting this call.
    pub async fn push_request(&self, request: &QueuedRequest) -> QueueResult<QueueKey> {
        let result = self.store_request(request).await;
        if let Err(e) = &result {
            error!(request = %request, error = %e, "could not queue request, it will not be replayed");
            let message = e.to_string();
            self.state.send_modify(|s| {
                s.failed_pushes += 1;
                s.last_push_error = Some(message);
            });
        }
        result
    }

    async fn store_request(&self, request: &QueuedRequest) -> QueueResult<QueueKey> {
        let payload = request.to_json()?;

        let mut store = self.store.lock().await;
        let live = sorted_keys(store.list_keys().await?);
        let high_water = match store.get_meta(HIGH_WATER_KEY).await? {
            Some(raw) => match raw.parse::<QueueKey>() {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(value = %raw, error = %e, "ignoring unreadable high-water mark");
                    None
                }
            },
            None => None,
        };
        let key = next_key(&live, high_water)?;

        store.set(&key.to_string(), &payload).await?;
        store.set_meta(HIGH_WATER_KEY, &key.to_string()).await?;
        let pending = live.len() + 1;
        self.state.send_modify(|s| s.pending = pending);
        drop(store);

        info!(key = %key, request = %request, pending, "queued request for replay");
        Ok(key)
    }

    /// Keys of every stored record, in replay order.
    pub async fn pending_keys(&self) -> QueueResult<Vec<QueueKey>> {
        let mut store = self.store.lock().await;
        Ok(sorted_keys(store.list_keys().await?))
    }

    /// Every stored record, in replay order.
    pub async fn entries(&self) -> QueueResult<Vec<QueueEntry>> {
        let mut store = self.store.lock().await;
        let keys = sorted_keys(store.list_keys().await?);
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(raw) = store.get(&key.to_string()).await? {
                entries.push(QueueEntry {
                    key,
                    request: QueuedRequest::from_json(&raw).ok(),
                });
            }
        }
        Ok(entries)
    }

    /// Replays every stored record in ascending key order.
    ///
    /// Only one drain runs at a time. A call that arrives while one is
    /// running returns [`DrainOutcome::Coalesced`] and makes the running
    /// drain do one more pass, so records pushed mid-drain are not stranded.
    /// A store failure aborts the drain; records not yet visited stay queued.
    pub async fn handle_synchronization(&self) -> QueueResult<DrainOutcome> {
        let Some(mut lease) = DrainLease::acquire(&self.draining) else {
            self.rerun.store(true, Ordering::Release);
            debug!("drain already running, coalescing");
            return Ok(DrainOutcome::Coalesced);
        };

        self.state.send_modify(|s| s.draining = true);
        let mut total = DrainReport::default();
        let result = loop {
            self.rerun.store(false, Ordering::Release);
            match self.drain_pass().await {
                Ok(report) => total.absorb(report),
                Err(e) => break Err(e),
            }
            if self.rerun.swap(false, Ordering::AcqRel) {
                continue;
            }
            lease.release();
            // A request may have slipped in between the swap and the release.
            if self.rerun.swap(false, Ordering::AcqRel) && lease.reacquire() {
                continue;
            }
            break Ok(total.clone());
        };
        drop(lease);

        match &result {
            Ok(report) => {
                info!(
                    attempted = report.attempted,
                    replayed = report.replayed,
                    retained = report.retained,
                    "drain finished"
                );
                let still_draining = self.draining.load(Ordering::Acquire);
                self.state.send_modify(|s| {
                    s.draining = still_draining;
                    s.last_drain = Some(report.clone());
                    s.last_drain_at = Some(Utc::now());
                });
            }
            Err(e) => {
                warn!(error = %e, "drain aborted by store failure");
                let still_draining = self.draining.load(Ordering::Acquire);
                self.state.send_modify(|s| s.draining = still_draining);
            }
        }
        result.map(DrainOutcome::Completed)
    }

    /// One pass over the keys present when it starts.
    async fn drain_pass(&self) -> QueueResult<DrainReport> {
        let keys = {
            let mut store = self.store.lock().await;
            sorted_keys(store.list_keys().await?)
        };
        let mut report = DrainReport {
            attempted: keys.len(),
            ..DrainReport::default()
        };

        for key in keys {
            let name = key.to_string();
            let raw = { self.store.lock().await.get(&name).await? };
            let Some(raw) = raw else {
                debug!(key = %key, "record vanished before replay");
                continue;
            };
            let request = match QueuedRequest::from_json(&raw) {
                Ok(request) => request,
                Err(e) => {
                    warn!(key = %key, error = %e, "undecodable record left in place");
                    report.retained += 1;
                    continue;
                }
            };

            match self.transport.send(&request).await {
                Ok(response) if response.is_success() => {
                    let mut store = self.store.lock().await;
                    store.delete(&name).await?;
                    self.state
                        .send_modify(|s| s.pending = s.pending.saturating_sub(1));
                    drop(store);
                    report.replayed += 1;
                    info!(key = %key, request = %request, status = response.status, "replayed");
                }
                Ok(response) => {
                    report.retained += 1;
                    if response.is_gateway_failure() {
                        report.network_failures += 1;
                    }
                    warn!(
                        key = %key,
                        request = %request,
                        status = response.status,
                        "replay rejected, record kept"
                    );
                }
                Err(e) => {
                    report.retained += 1;
                    if e.is_network() {
                        report.network_failures += 1;
                    }
                    warn!(key = %key, request = %request, error = %e, "replay failed, record kept");
                }
            }
        }

        Ok(report)
    }
}
