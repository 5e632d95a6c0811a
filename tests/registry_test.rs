//! Registry bookkeeping and cancel-all.

mod support;

use std::sync::Arc;
use std::thread;
use support::{Event, Harness, Recorder};
use urlconn::{ConnectionRegistry, LoadState};

#[test]
fn test_cancel_all_cancels_every_active_connection() {
    let h = Harness::new();
    let rec = Recorder::default();
    let conns: Vec<_> = (0..5)
        .map(|i| {
            rec.watch(h.context.get(format!("http://api.example.com/{}", i)))
                .start()
                .unwrap()
        })
        .collect();
    assert_eq!(h.context.registry().len(), 5);
    assert_eq!(h.context.registry().connections().len(), 5);

    assert_eq!(h.context.cancel_all(), 5);
    h.pump();

    assert!(conns.iter().all(|c| c.load_state() == LoadState::Cancelled));
    assert!(h.context.registry().is_empty());
    assert!(rec.events().is_empty());
    assert_eq!(h.transport.cancelled(), 5);
}

#[test]
fn test_cancel_all_honours_queued_finish() {
    let h = Harness::new();
    let rec = Recorder::default();
    let first = rec.watch(h.context.get("http://api.example.com/1")).start().unwrap();
    let second = rec.watch(h.context.get("http://api.example.com/2")).start().unwrap();

    let (_, sink) = h.transport.take();
    sink.finish();
    h.context.cancel_all();
    assert!(h.context.registry().is_empty());
    h.pump();

    assert_eq!(first.load_state(), LoadState::Completed);
    assert_eq!(second.load_state(), LoadState::Cancelled);
    assert_eq!(rec.events(), vec![Event::Complete { succeeded: true }]);
    assert!(h.context.registry().is_empty());
}

#[test]
fn test_cancel_all_races_with_starts() {
    let h = Arc::new(Harness::new());

    let starters: Vec<_> = (0..4)
        .map(|t| {
            let h = h.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        h.context
                            .get(format!("http://api.example.com/{}/{}", t, i))
                            .start()
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let cancellers: Vec<_> = (0..2)
        .map(|_| {
            let h = h.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    h.context.cancel_all();
                    thread::yield_now();
                }
            })
        })
        .collect();

    let conns: Vec<_> = starters.into_iter().flat_map(|t| t.join().unwrap()).collect();
    for c in cancellers {
        c.join().unwrap();
    }

    // Every connection was either cancelled or is still tracked.
    let registry = h.context.registry();
    for conn in &conns {
        let cancelled = conn.load_state() == LoadState::Cancelled;
        assert!(cancelled ^ registry.contains(conn.id()), "{:?}", conn);
    }
    let live = conns.iter().filter(|c| !c.is_cancelled()).count();
    assert_eq!(registry.len(), live);

    h.context.cancel_all();
    assert!(registry.is_empty());
    assert!(conns.iter().all(|c| c.is_cancelled()));
}

#[test]
fn test_registries_are_isolated_and_shareable() {
    let shared = Arc::new(ConnectionRegistry::new());
    let a = Harness::new();
    let b = Harness::new();
    assert!(a.context.registry().is_empty());

    let ctx = urlconn::ConnectionContext::builder()
        .primary(a.primary.clone())
        .worker(Arc::new(urlconn::dispatch::InlineExecutor))
        .transport(a.transport.clone())
        .registry(shared.clone())
        .build()
        .unwrap();

    let conn = ctx.get("http://api.example.com/").start().unwrap();
    assert!(shared.contains(conn.id()));
    assert!(a.context.registry().is_empty());
    assert!(b.context.registry().is_empty());

    assert!(shared.remove(conn.id()));
    assert!(!shared.remove(conn.id()));
    assert!(shared.is_empty());
}

#[test]
fn test_active_count_tracks_membership_under_contention() {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    let h = Arc::new(Harness::new());
    let started = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let starters: Vec<_> = (0..4)
        .map(|t| {
            let (h, started) = (h.clone(), started.clone());
            thread::spawn(move || {
                (0..500)
                    .map(|i| {
                        started.fetch_add(1, Ordering::SeqCst);
                        h.context
                            .get(format!("http://api.example.com/{}/{}", t, i))
                            .start()
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let canceller = {
        let (h, done) = (h.clone(), done.clone());
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                for conn in h.context.registry().connections() {
                    conn.cancel();
                }
            }
        })
    };

    let watcher = {
        let (h, started, done) = (h.clone(), started.clone(), done.clone());
        thread::spawn(move || {
            let mut max_seen = 0;
            while !done.load(Ordering::SeqCst) {
                let len = h.context.registry().len();
                let limit = started.load(Ordering::SeqCst);
                assert!(len <= limit, "len {} with only {} started", len, limit);
                max_seen = max_seen.max(len);
            }
            max_seen
        })
    };

    let conns: Vec<_> = starters.into_iter().flat_map(|t| t.join().unwrap()).collect();
    done.store(true, Ordering::SeqCst);
    canceller.join().unwrap();
    watcher.join().unwrap();

    let registry = h.context.registry();
    let live = conns.iter().filter(|c| !c.is_cancelled()).count();
    assert_eq!(registry.len(), live);
    assert_eq!(registry.connections().len(), live);
    for conn in &conns {
        assert!(conn.concurrency_at_start() >= 1);
        assert!(conn.concurrency_at_start() <= conns.len());
    }

    h.context.cancel_all();
    assert!(registry.is_empty());
}
