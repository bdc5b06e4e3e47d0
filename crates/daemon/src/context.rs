// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide sync context.
//!
//! Built once at startup, the context owns the failure observer and wires
//! the write queue and connectivity monitor to it:
//!
//! ```text
//!  GithubClient ──offline──► FailureObserver ──► queue handler ──push──► worker ──► WriteQueue
//!                                   │        └──► monitor handler ──► probe cycle
//!                                   ◄───────────────sync──────────────────┘
//!                                   └──► queue handler ──drain──► worker ──► drain task
//! ```
//!
//! Handlers never touch the store themselves. They forward commands over a
//! channel to a single worker task, which applies pushes in the order the
//! failures were published and spawns drains. Drains coalesce inside the
//! queue, so a burst of Sync events costs one pass (plus at most one rerun).
//!
//! The context's [`GithubClient`] registers with [`PushAcks`] before it
//! publishes, so it only reports a call as saved once the worker has stored
//! it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hq_core::{FailureObserver, HandlerError, QueuedRequest, Subscriber, SyncEvent};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::github::GithubClient;
use crate::monitor::{ConnectivityMonitor, HttpProber, Prober};
use crate::queue::{DrainOutcome, PushAcks, PushReceipt, QueueState, WriteQueue};
use crate::store::KvStore;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Settings the context needs beyond its components.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
    pub api_base: String,
    pub user_agent: String,
}

impl From<&Config> for ContextOptions {
    fn from(config: &Config) -> Self {
        ContextOptions {
            probe_interval: config.probe.interval(),
            probe_timeout: config.probe.timeout(),
            api_base: config.github.api_base.clone(),
            user_agent: config.github.user_agent.clone(),
        }
    }
}

enum QueueCommand {
    Push(QueuedRequest, Option<oneshot::Sender<PushReceipt>>),
    Drain,
}

/// The running sync machinery.
pub struct SyncContext {
    observer: Arc<FailureObserver>,
    queue: Arc<WriteQueue>,
    monitor: ConnectivityMonitor,
    transport: Arc<dyn HttpTransport>,
    options: ContextOptions,
    acks: Arc<PushAcks>,
    commands: mpsc::UnboundedSender<QueueCommand>,
    worker: JoinHandle<()>,
    subscribers: Vec<Subscriber>,
}

impl SyncContext {
    /// Starts the context from configuration, with the real HTTP transport.
    pub async fn start(config: &Config, state_dir: &Path) -> Result<Self> {
        let user_agent = config.github.user_agent.as_str();
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(config.replay.timeout(), user_agent)?);
        let probe_transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(config.probe.timeout(), user_agent)?);
        let prober: Arc<dyn Prober> =
            Arc::new(HttpProber::new(probe_transport, config.probe.url.as_str()));

        Self::with_parts(
            config.store.build(state_dir),
            transport,
            prober,
            ContextOptions::from(config),
        )
        .await
    }

    /// Starts the context from explicit components.
    ///
    /// If the store already holds records, a probe cycle starts right away
    /// so they are replayed as soon as the server is reachable.
    pub async fn with_parts(
        store: Box<dyn KvStore>,
        transport: Arc<dyn HttpTransport>,
        prober: Arc<dyn Prober>,
        options: ContextOptions,
    ) -> Result<Self> {
        let observer = Arc::new(FailureObserver::new());
        let monitor = ConnectivityMonitor::new(
            prober,
            Arc::clone(&observer),
            options.probe_interval,
            options.probe_timeout,
        )?;
        let queue = Arc::new(WriteQueue::open(store, Arc::clone(&transport)).await?);

        let acks = Arc::new(PushAcks::new());
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&queue), monitor.clone(), receiver));

        let subscribers = vec![
            queue_subscriber(commands.clone(), Arc::clone(&acks)),
            monitor.subscriber(),
            report_subscriber(),
        ];
        for subscriber in &subscribers {
            observer.subscribe(Arc::clone(subscriber));
        }

        let pending = queue.state().pending;
        if pending > 0 {
            info!(pending, "records left from a previous run, waiting for connectivity");
            monitor.start_probe();
        }
        info!("sync context started");

        Ok(SyncContext {
            observer,
            queue,
            monitor,
            transport,
            options,
            acks,
            commands,
            worker,
            subscribers,
        })
    }

    /// The failure observer. Anything may publish to it.
    pub fn observer(&self) -> &Arc<FailureObserver> {
        &self.observer
    }

    pub fn queue(&self) -> &Arc<WriteQueue> {
        &self.queue
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// A GitHub client publishing to this context's observer. Its offline
    /// writes report [`Delivery::SavedOffline`](crate::github::Delivery) only
    /// after the queue stored them.
    pub fn github(&self) -> GithubClient {
        GithubClient::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.observer),
            &self.options.api_base,
            &self.options.user_agent,
        )
        .with_push_acks(Arc::clone(&self.acks))
    }

    /// Receiver for queue state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<QueueState> {
        self.queue.subscribe_state()
    }

    /// Asks the worker for a drain, as a Sync event would.
    pub fn request_drain(&self) -> Result<()> {
        self.commands
            .send(QueueCommand::Drain)
            .map_err(|_| Error::WorkerStopped)
    }

    /// Stops the monitor and worker, then disconnects the store.
    ///
    /// Pushes already handed to the worker are applied first. A drain that
    /// is still running is cancelled; its unreplayed records stay stored.
    pub async fn shutdown(self) -> Result<()> {
        let SyncContext {
            observer,
            queue,
            monitor,
            acks,
            commands,
            worker,
            subscribers,
            ..
        } = self;

        for subscriber in &subscribers {
            observer.unsubscribe(subscriber);
        }
        // Nothing will take these any more.
        acks.close();
        // The worker exits once every sender, including the one captured by
        // the queue handler, is gone.
        drop(subscribers);
        drop(commands);
        monitor.stop();

        if let Err(e) = worker.await {
            error!(error = %e, "queue worker failed");
        }
        queue.close().await?;
        info!("sync context stopped");
        Ok(())
    }
}

/// Forwards Offline (mutating calls only) and Sync to the worker.
fn queue_subscriber(
    commands: mpsc::UnboundedSender<QueueCommand>,
    acks: Arc<PushAcks>,
) -> Subscriber {
    Arc::new(move |event: &SyncEvent| -> std::result::Result<(), HandlerError> {
        let command = match event {
            SyncEvent::Offline { config, .. } if config.is_mutating() => {
                QueueCommand::Push(config.clone(), acks.take(config))
            }
            SyncEvent::Offline { config, .. } => {
                debug!(request = %config, "not queueing read call");
                return Ok(());
            }
            SyncEvent::Sync => QueueCommand::Drain,
            SyncEvent::UnknownError { .. } | SyncEvent::Unrecognized => return Ok(()),
        };
        commands
            .send(command)
            .map_err(|_| HandlerError::from("queue worker has stopped"))
    })
}

/// Logs events nobody else acts on.
fn report_subscriber() -> Subscriber {
    Arc::new(|event: &SyncEvent| -> std::result::Result<(), HandlerError> {
        match event {
            SyncEvent::UnknownError { message, error } => {
                warn!(%message, %error, "unexpected failure reported");
            }
            SyncEvent::Unrecognized => debug!("ignoring unrecognized event"),
            SyncEvent::Offline { .. } | SyncEvent::Sync => {}
        }
        Ok(())
    })
}

async fn run_worker(
    queue: Arc<WriteQueue>,
    monitor: ConnectivityMonitor,
    mut commands: mpsc::UnboundedReceiver<QueueCommand>,
) {
    let mut drains = JoinSet::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(QueueCommand::Push(request, ack)) => {
                    let result = queue.push_request(&request).await;
                    if let Some(ack) = ack {
                        // The publisher may have given up waiting.
                        let _ = ack.send(result.map_err(|e| e.to_string()));
                    }
                }
                Some(QueueCommand::Drain) => {
                    drains.spawn(drain(Arc::clone(&queue), monitor.clone()));
                }
                None => break,
            },
            Some(joined) = drains.join_next(), if !drains.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "drain task failed");
                }
            }
        }
    }

    drains.shutdown().await;
    debug!("queue worker stopped");
}

async fn drain(queue: Arc<WriteQueue>, monitor: ConnectivityMonitor) {
    match queue.handle_synchronization().await {
        Ok(DrainOutcome::Completed(report)) if report.network_failures > 0 => {
            warn!(
                retained = report.retained,
                network_failures = report.network_failures,
                "server unreachable during replay, probing again"
            );
            monitor.start_probe();
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "drain aborted"),
    }
}
