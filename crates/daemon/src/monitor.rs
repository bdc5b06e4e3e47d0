// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitor.
//!
//! After an Offline event the monitor probes a reference URL on a fixed
//! interval until one probe succeeds, then publishes Sync and stops. At most
//! one probe cycle exists at a time; asking for another while one runs hands
//! back the running cycle. Probes inside a cycle never overlap: each one is
//! awaited (and bounded by a timeout) before the next tick is taken, and
//! ticks missed while a probe was slow are skipped rather than bunched up.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hq_core::{FailureObserver, HandlerError, HttpMethod, QueuedRequest, Subscriber, SyncEvent};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::transport::{HttpTransport, TransportError};

/// Status reported for a probe that produced no response.
pub const NO_RESPONSE_STATUS: u16 = 500;

/// Error type for monitor setup.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("connectivity monitor needs a tokio runtime\n  hint: create it from inside a runtime")]
    NoRuntime,

    #[error("probe interval must be greater than zero")]
    ZeroInterval,
}

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: u16,
    pub message: String,
}

impl ProbeResult {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        ProbeResult {
            status,
            message: message.into(),
        }
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Boxed future returned by [`Prober::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = ProbeResult> + Send + 'a>>;

/// A reachability check. Never fails; failures are encoded in the result.
pub trait Prober: Send + Sync {
    fn probe(&self) -> ProbeFuture<'_>;
}

/// Probes by sending a GET to a reference URL.
pub struct HttpProber {
    transport: Arc<dyn HttpTransport>,
    target: String,
}

impl HttpProber {
    pub fn new(transport: Arc<dyn HttpTransport>, target: impl Into<String>) -> Self {
        HttpProber {
            transport,
            target: target.into(),
        }
    }
}

impl Prober for HttpProber {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            let request = QueuedRequest::new(HttpMethod::Get, self.target.as_str());
            match self.transport.send(&request).await {
                Ok(response) if response.is_success() => {
                    ProbeResult::new(response.status, "Connection reestablished")
                }
                Ok(response) => ProbeResult::new(response.status, response.reason),
                Err(TransportError::Timeout(_)) => {
                    ProbeResult::new(NO_RESPONSE_STATUS, "Probe timed out")
                }
                Err(e) if e.is_network() => {
                    ProbeResult::new(NO_RESPONSE_STATUS, "No response from server")
                }
                Err(e) => ProbeResult::new(NO_RESPONSE_STATUS, format!("Unknown error: {e}")),
            }
        })
    }
}

/// Resolves when the probe cycle it belongs to succeeds.
#[derive(Debug, Clone)]
pub struct ProbeHandle {
    result: watch::Receiver<Option<ProbeResult>>,
}

impl ProbeHandle {
    /// Waits for the successful probe. Returns `None` if the cycle was
    /// stopped first.
    pub async fn wait(mut self) -> Option<ProbeResult> {
        match self.result.wait_for(Option::is_some).await {
            Ok(result) => (*result).clone(),
            Err(_) => None,
        }
    }
}

struct Cycle {
    id: u64,
    result: watch::Receiver<Option<ProbeResult>>,
    task: JoinHandle<()>,
}

struct MonitorInner {
    prober: Arc<dyn Prober>,
    observer: Arc<FailureObserver>,
    interval: Duration,
    timeout: Duration,
    runtime: Handle,
    cycle: Mutex<Option<Cycle>>,
    cycles_started: AtomicU64,
}

impl MonitorInner {
    fn cycle(&self) -> MutexGuard<'_, Option<Cycle>> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The connectivity monitor. Clones share the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

impl ConnectivityMonitor {
    /// Creates a monitor bound to the current tokio runtime.
    ///
    /// `interval` is the pause before each probe (the first probe is not
    /// immediate); `timeout` bounds a single probe.
    pub fn new(
        prober: Arc<dyn Prober>,
        observer: Arc<FailureObserver>,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Self, MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::ZeroInterval);
        }
        let runtime = Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        Ok(ConnectivityMonitor {
            inner: Arc::new(MonitorInner {
                prober,
                observer,
                interval,
                timeout,
                runtime,
                cycle: Mutex::new(None),
                cycles_started: AtomicU64::new(0),
            }),
        })
    }

    /// Starts a probe cycle, or returns the handle of the one already
    /// running.
    pub fn start_probe(&self) -> ProbeHandle {
        let mut cycle = self.inner.cycle();
        if let Some(running) = cycle.as_ref() {
            if !running.task.is_finished() {
                debug!("probe cycle already running");
                return ProbeHandle {
                    result: running.result.clone(),
                };
            }
        }

        let id = self.inner.cycles_started.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = watch::channel(None);
        let task = self
            .inner
            .runtime
            .spawn(run_cycle(Arc::clone(&self.inner), id, tx));
        *cycle = Some(Cycle {
            id,
            result: rx.clone(),
            task,
        });
        info!(
            interval_ms = self.inner.interval.as_millis() as u64,
            "offline, probing for connectivity"
        );
        ProbeHandle { result: rx }
    }

    /// Whether a probe cycle is running.
    pub fn is_probing(&self) -> bool {
        self.inner
            .cycle()
            .as_ref()
            .is_some_and(|c| !c.task.is_finished())
    }

    /// Number of probe cycles started since creation.
    pub fn cycles_started(&self) -> u64 {
        self.inner.cycles_started.load(Ordering::SeqCst)
    }

    /// Cancels the running cycle, if any. Its handles resolve to `None`.
    pub fn stop(&self) {
        if let Some(cycle) = self.inner.cycle().take() {
            cycle.task.abort();
            debug!("probe cycle stopped");
        }
    }

    /// Bus subscriber that starts a cycle on every Offline event.
    pub fn subscriber(&self) -> Subscriber {
        let monitor = self.clone();
        Arc::new(move |event: &SyncEvent| -> Result<(), HandlerError> {
            if let SyncEvent::Offline { .. } = event {
                monitor.start_probe();
            }
            Ok(())
        })
    }
}

async fn run_cycle(inner: Arc<MonitorInner>, id: u64, result: watch::Sender<Option<ProbeResult>>) {
    let mut ticker = interval_at(Instant::now() + inner.interval, inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let outcome = match tokio::time::timeout(inner.timeout, inner.prober.probe()).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeResult::new(NO_RESPONSE_STATUS, "Probe timed out"),
        };

        if !outcome.is_success() {
            debug!(status = outcome.status, message = %outcome.message, "still offline");
            continue;
        }

        info!(status = outcome.status, "connectivity reestablished");
        {
            let mut cycle = inner.cycle();
            if cycle.as_ref().is_some_and(|c| c.id == id) {
                *cycle = None;
            }
        }
        // Handles may all be gone; nobody waiting is fine.
        let _ = result.send(Some(outcome));
        inner.observer.notify(SyncEvent::sync());
        return;
    }
}
