//! Integration tests for store closing and signal handling.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clusterwatch::collectors::Family;
use clusterwatch::reading::{Batch, Reading};
use clusterwatch::shutdown::SignalSet;
use clusterwatch::store::{FactStore, SharedStore, StoreError};

#[test]
fn test_close_waits_for_in_flight_batch() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("power.db");
    let store = FactStore::open(&db).unwrap();
    store.ensure_schema(Family::Power).unwrap();
    let shared = SharedStore::new(store);

    let (started_tx, started_rx) = mpsc::channel();
    let writer = {
        let shared = shared.clone();
        thread::spawn(move || {
            shared.with_store(|s| {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(200));
                s.write_batch(&Batch::Facts(vec![
                    Reading::new(100, 1, "t", 500.0),
                    Reading::new(100, 2, "t", 600.0),
                ]))
            })
        })
    };

    started_rx.recv().unwrap();
    // Blocks until the writer releases the store.
    shared.close().unwrap();
    assert_eq!(writer.join().unwrap().unwrap(), 2);
    assert!(shared.is_closed());

    let reopened = FactStore::open_read_only(&db).unwrap();
    assert_eq!(reopened.fact_count().unwrap(), 2);
}

#[test]
fn test_write_after_close_is_rejected() {
    let store = FactStore::open_in_memory().unwrap();
    store.ensure_schema(Family::Power).unwrap();
    let shared = SharedStore::new(store);
    shared.close().unwrap();

    let err = shared
        .write_batch(&Batch::Facts(vec![Reading::new(1, 1, "c", 1.0)]))
        .unwrap_err();
    assert!(matches!(err, StoreError::Closed));
}

#[tokio::test]
async fn test_user_signal_is_reported_by_name() {
    let signals = SignalSet::install(true);
    let received = tokio::spawn(signals.recv());

    tokio::time::sleep(Duration::from_millis(50)).await;
    // SAFETY: raising a signal that has a handler installed.
    unsafe {
        libc::raise(libc::SIGUSR2);
    }

    let name = tokio::time::timeout(Duration::from_secs(5), received)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(name, "SIGUSR2");
}
