// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// Handler that records the kind of every event it sees, tagged with a label.
fn recorder(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Subscriber {
    let log = Arc::clone(log);
    Arc::new(move |event: &SyncEvent| -> Result<(), HandlerError> {
        log.lock().unwrap().push(format!("{label}:{}", event.kind()));
        Ok(())
    })
}

#[test]
fn delivers_in_registration_order() {
    let observer = FailureObserver::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    observer.subscribe(recorder("a", &log));
    observer.subscribe(recorder("b", &log));

    observer.notify(SyncEvent::sync());

    assert_eq!(*log.lock().unwrap(), vec!["a:sync", "b:sync"]);
}

#[test]
fn duplicate_registration_multiplies_delivery() {
    let observer = FailureObserver::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let handler = recorder("a", &log);
    observer.subscribe(Arc::clone(&handler));
    observer.subscribe(handler);

    observer.notify(SyncEvent::sync());

    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn unsubscribe_by_identity() {
    let observer = FailureObserver::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = recorder("a", &log);
    let b = recorder("b", &log);
    observer.subscribe(Arc::clone(&a));
    observer.subscribe(Arc::clone(&b));

    observer.unsubscribe(&a);
    observer.notify(SyncEvent::sync());

    assert_eq!(*log.lock().unwrap(), vec!["b:sync"]);
    assert_eq!(observer.subscriber_count(), 1);
}

#[test]
fn unsubscribe_unknown_handler_is_noop() {
    let observer = FailureObserver::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    observer.subscribe(recorder("a", &log));

    observer.unsubscribe(&recorder("a", &log));

    assert_eq!(observer.subscriber_count(), 1);
}

#[test]
fn failing_handlers_do_not_stop_delivery() {
    let observer = FailureObserver::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    observer.subscribe(Arc::new(|_: &SyncEvent| -> Result<(), HandlerError> {
        Err("boom".into())
    }));
    observer.subscribe(Arc::new(|_: &SyncEvent| -> Result<(), HandlerError> {
        panic!("handler bug")
    }));
    observer.subscribe(recorder("last", &log));

    observer.notify(SyncEvent::sync());
    observer.notify(SyncEvent::unknown_error("x", "y"));

    assert_eq!(
        *log.lock().unwrap(),
        vec!["last:sync", "last:unknown_error"]
    );
}

#[test]
fn subscribe_during_dispatch_applies_to_next_event() {
    let observer = Arc::new(FailureObserver::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let late = recorder("late", &log);

    let obs = Arc::clone(&observer);
    let added = AtomicBool::new(false);
    observer.subscribe(Arc::new(move |_: &SyncEvent| -> Result<(), HandlerError> {
        if !added.swap(true, Ordering::SeqCst) {
            obs.subscribe(Arc::clone(&late));
        }
        Ok(())
    }));

    observer.notify(SyncEvent::sync());
    assert!(log.lock().unwrap().is_empty());

    observer.notify(SyncEvent::sync());
    assert_eq!(*log.lock().unwrap(), vec!["late:sync"]);
}

#[test]
fn reentrant_notify_is_delivered_after_current_event() {
    let observer = Arc::new(FailureObserver::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    let obs = Arc::clone(&observer);
    observer.subscribe(Arc::new(move |event: &SyncEvent| -> Result<(), HandlerError> {
        if matches!(event, SyncEvent::UnknownError { .. }) {
            obs.notify(SyncEvent::sync());
        }
        Ok(())
    }));
    observer.subscribe(recorder("b", &log));

    observer.notify(SyncEvent::unknown_error("x", "y"));

    assert_eq!(*log.lock().unwrap(), vec!["b:unknown_error", "b:sync"]);
}

#[test]
fn concurrent_notify_never_overlaps_a_handler() {
    let observer = Arc::new(FailureObserver::new());
    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let delivered = Arc::new(AtomicUsize::new(0));

    {
        let inside = Arc::clone(&inside);
        let overlaps = Arc::clone(&overlaps);
        let delivered = Arc::clone(&delivered);
        observer.subscribe(Arc::new(move |_: &SyncEvent| -> Result<(), HandlerError> {
            if inside.swap(true, Ordering::SeqCst) {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            thread::yield_now();
            inside.store(false, Ordering::SeqCst);
            delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    }

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let observer = Arc::clone(&observer);
            thread::spawn(move || {
                for _ in 0..50 {
                    observer.notify(SyncEvent::sync());
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(delivered.load(Ordering::SeqCst), 400);
}
