// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the connectivity monitor.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use hq_core::{FailureObserver, HttpMethod, SyncEvent};
use yare::parameterized;

use crate::monitor::{
    ConnectivityMonitor, HttpProber, MonitorError, ProbeResult, Prober, NO_RESPONSE_STATUS,
};
use crate::test_helpers::{post, EventLog, MockProber, ProbeStep};
use crate::transport::TransportError;
use crate::transport_tests::{MockReply, MockTransport};

const INTERVAL: Duration = Duration::from_secs(5);
const TIMEOUT: Duration = Duration::from_secs(2);

fn monitor_with(prober: &Arc<MockProber>) -> (ConnectivityMonitor, Arc<FailureObserver>, EventLog) {
    let observer = Arc::new(FailureObserver::new());
    let log = EventLog::new();
    observer.subscribe(log.subscriber());
    let prober: Arc<dyn Prober> = prober.clone();
    let monitor =
        ConnectivityMonitor::new(prober, Arc::clone(&observer), INTERVAL, TIMEOUT).unwrap();
    (monitor, observer, log)
}

#[tokio::test(start_paused = true)]
async fn probes_until_success_then_publishes_sync() {
    let prober = Arc::new(MockProber::failing(2));
    let (monitor, _observer, log) = monitor_with(&prober);

    let result = monitor.start_probe().wait().await.unwrap();
    assert_eq!(result.status, 200);
    assert_eq!(prober.probes(), 3);
    assert_eq!(log.kinds(), vec!["sync"]);
    assert!(!monitor.is_probing());
}

#[tokio::test(start_paused = true)]
async fn first_probe_waits_one_interval() {
    let prober = Arc::new(MockProber::failing(100));
    let (monitor, _observer, _log) = monitor_with(&prober);

    monitor.start_probe();
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(prober.probes(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(prober.probes(), 1);
    monitor.stop();
}

#[tokio::test(start_paused = true)]
async fn start_probe_is_idempotent_while_running() {
    let prober = Arc::new(MockProber::failing(3));
    let (monitor, _observer, log) = monitor_with(&prober);

    let first = monitor.start_probe();
    let second = monitor.start_probe();
    assert!(monitor.is_probing());
    assert_eq!(monitor.cycles_started(), 1);

    let (a, b) = tokio::join!(first.wait(), second.wait());
    assert_eq!(a, b);
    assert_eq!(prober.probes(), 4);
    assert_eq!(prober.max_in_flight(), 1);
    assert_eq!(log.kinds(), vec!["sync"]);
}

#[tokio::test(start_paused = true)]
async fn failed_probes_publish_nothing() {
    let prober = Arc::new(MockProber::failing(100));
    let (monitor, _observer, log) = monitor_with(&prober);

    monitor.start_probe();
    tokio::time::sleep(Duration::from_secs(27)).await;
    assert_eq!(prober.probes(), 5);
    assert!(log.events().is_empty());
    assert!(monitor.is_probing());

    monitor.stop();
    assert!(!monitor.is_probing());
}

#[tokio::test(start_paused = true)]
async fn hung_probe_is_bounded_by_timeout() {
    let prober = Arc::new(MockProber::new([ProbeStep::Hang, ProbeStep::Reply(204)]));
    let (monitor, _observer, log) = monitor_with(&prober);

    let result = monitor.start_probe().wait().await.unwrap();
    assert_eq!(result.status, 204);
    assert_eq!(prober.probes(), 2);
    assert_eq!(prober.max_in_flight(), 1);
    assert_eq!(log.kinds(), vec!["sync"]);
}

#[tokio::test(start_paused = true)]
async fn new_cycle_after_success() {
    let prober = Arc::new(MockProber::failing(0));
    let (monitor, _observer, log) = monitor_with(&prober);

    monitor.start_probe().wait().await.unwrap();
    monitor.start_probe().wait().await.unwrap();
    assert_eq!(monitor.cycles_started(), 2);
    assert_eq!(log.kinds(), vec!["sync", "sync"]);
}

#[tokio::test(start_paused = true)]
async fn stop_resolves_handles_to_none() {
    let prober = Arc::new(MockProber::failing(100));
    let (monitor, _observer, log) = monitor_with(&prober);

    let handle = monitor.start_probe();
    tokio::time::sleep(Duration::from_secs(6)).await;
    monitor.stop();

    assert_eq!(handle.wait().await, None);
    assert!(log.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn offline_events_start_a_single_cycle() {
    let prober = Arc::new(MockProber::failing(100));
    let (monitor, observer, _log) = monitor_with(&prober);
    observer.subscribe(monitor.subscriber());

    observer.notify(SyncEvent::offline("down", post("/a")));
    observer.notify(SyncEvent::offline("down", post("/b")));
    observer.notify(SyncEvent::unknown_error("bad", "parse"));
    assert!(monitor.is_probing());
    assert_eq!(monitor.cycles_started(), 1);
    monitor.stop();
}

#[tokio::test]
async fn sync_event_does_not_start_a_cycle() {
    let prober = Arc::new(MockProber::failing(0));
    let (monitor, observer, _log) = monitor_with(&prober);
    observer.subscribe(monitor.subscriber());

    observer.notify(SyncEvent::sync());
    assert!(!monitor.is_probing());
    assert_eq!(monitor.cycles_started(), 0);
}

#[tokio::test]
async fn zero_interval_is_rejected() {
    let prober: Arc<dyn Prober> = Arc::new(MockProber::failing(0));
    let result = ConnectivityMonitor::new(
        prober,
        Arc::new(FailureObserver::new()),
        Duration::ZERO,
        TIMEOUT,
    );
    assert!(matches!(result, Err(MonitorError::ZeroInterval)));
}

#[test]
fn requires_a_runtime() {
    let prober: Arc<dyn Prober> = Arc::new(MockProber::failing(0));
    let result = ConnectivityMonitor::new(
        prober,
        Arc::new(FailureObserver::new()),
        INTERVAL,
        TIMEOUT,
    );
    assert!(matches!(result, Err(MonitorError::NoRuntime)));
}

#[tokio::test]
async fn http_prober_maps_outcomes() {
    let cases = [
        (MockReply::Status(200), 200, "Connection reestablished"),
        (MockReply::Status(204), 204, "Connection reestablished"),
        (MockReply::Status(404), 404, "Not Found"),
        (MockReply::Status(503), 503, "Service Unavailable"),
        (
            MockReply::Fail(TransportError::ConnectionFailed("refused".into())),
            NO_RESPONSE_STATUS,
            "No response from server",
        ),
        (
            MockReply::Fail(TransportError::RequestFailed("reset".into())),
            NO_RESPONSE_STATUS,
            "No response from server",
        ),
        (
            MockReply::Fail(TransportError::Timeout("slow".into())),
            NO_RESPONSE_STATUS,
            "Probe timed out",
        ),
    ];

    for (reply, status, message) in cases {
        let transport = Arc::new(MockTransport::replying(reply));
        let prober = HttpProber::new(transport.clone(), "https://probe.example.com/");
        assert_eq!(prober.probe().await, ProbeResult::new(status, message));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].url, "https://probe.example.com/");
        assert!(sent[0].body.is_none());
    }
}

#[parameterized(
    ok = { 200, true },
    edge = { 299, true },
    redirect = { 300, false },
    no_response = { NO_RESPONSE_STATUS, false },
)]
fn probe_result_success_range(status: u16, success: bool) {
    assert_eq!(ProbeResult::new(status, "").is_success(), success);
}
