//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use crossbeam_channel::bounded;
use staged_pipeline::{channel, Message, QueueCapacity, QueueReader};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Upper bound for a pipeline test to finish before it counts as deadlocked
pub fn test_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Run `f` on a helper thread and fail the test if it does not return in time.
pub fn run_with_timeout<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(test_timeout())
        .expect("pipeline did not finish in time (deadlock?)")
}

/// Fill an unbounded queue with `values` and close it.
pub fn closed_queue<T>(name: &str, values: impl IntoIterator<Item = T>) -> QueueReader<T> {
    let (writer, reader) = channel(name, QueueCapacity::Unbounded);
    for value in values {
        writer.write(value).unwrap();
    }
    writer.close().unwrap();
    reader
}

/// Read until end of stream.
pub fn collect_values<T>(reader: &QueueReader<T>) -> Vec<T> {
    let mut values = Vec::new();
    while let Message::Value(value) = reader.read() {
        values.push(value);
    }
    values
}

/// Counts payload creation and release across threads.
#[derive(Clone, Default)]
pub struct DropLedger {
    created: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
    drop_order: Arc<Mutex<Vec<u64>>>,
}

impl DropLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a payload tracked by this ledger.
    pub fn payload(&self, id: u64) -> Tracked {
        self.created.fetch_add(1, Ordering::SeqCst);
        Tracked {
            id,
            ledger: self.clone(),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Payloads created but not yet released
    pub fn live(&self) -> usize {
        self.created() - self.dropped()
    }

    /// Ids in the order their payloads were released
    pub fn drop_order(&self) -> Vec<u64> {
        self.drop_order.lock().unwrap().clone()
    }

    /// Panics if any payload was released twice or never.
    pub fn assert_balanced(&self) {
        let order = self.drop_order();
        let mut unique = order.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), order.len(), "payload released twice: {:?}", order);
        assert_eq!(self.live(), 0, "{} payloads leaked", self.live());
    }
}

/// Drop-counting payload. Deliberately not `Clone`.
pub struct Tracked {
    pub id: u64,
    ledger: DropLedger,
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tracked({})", self.id)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.ledger.dropped.fetch_add(1, Ordering::SeqCst);
        self.ledger.drop_order.lock().unwrap().push(self.id);
    }
}
