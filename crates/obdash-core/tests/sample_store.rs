//! Sample store concurrency tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use obdash_core::link::ConnectionState;
use obdash_core::sample::SampleStore;

#[test]
fn test_no_torn_reads_under_contention() {
    let store = SampleStore::new();
    let done = Arc::new(AtomicBool::new(false));

    // Every write keeps rpm and connected in lock-step: even rpm <=> connected
    let writer = {
        let store = store.clone();
        let done = done.clone();
        thread::spawn(move || {
            for i in 1..=200_000u64 {
                let connected = i % 2 == 0;
                store.write(i as f64, connected);
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0u64;
                let mut last_sequence = 0;
                while !done.load(Ordering::SeqCst) {
                    let s = store.read();
                    if s.sequence == 0 {
                        continue;
                    }
                    let even = (s.rpm as u64) % 2 == 0;
                    assert_eq!(even, s.connected, "torn snapshot: {:?}", s);
                    assert_eq!(s.sequence, s.rpm as u64, "sequence out of step: {:?}", s);
                    assert!(s.sequence >= last_sequence, "went backwards");
                    last_sequence = s.sequence;
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let last = store.read();
    assert_eq!(last.rpm, 200_000.0);
    assert!(last.connected);
    assert_eq!(last.sequence, 200_000);
}

#[test]
fn test_latest_value_wins() {
    let store = SampleStore::new();
    for rpm in [1000.0, 2000.0, 3000.0] {
        store.write(rpm, true);
    }
    // Single slot: earlier unread values are gone
    assert_eq!(store.read().rpm, 3000.0);
}

#[test]
fn test_connected_write_sets_link_state() {
    let store = SampleStore::new();
    store.mark_disconnected(ConnectionState::IgnitionOff);
    store.write(800.0, true);
    assert_eq!(store.read().link, ConnectionState::CarConnected);
}

#[test]
fn test_clones_share_slot() {
    let store = SampleStore::new();
    let other = store.clone();
    other.write_speed(88.0);
    assert_eq!(store.read().speed_kph, Some(88.0));
}
