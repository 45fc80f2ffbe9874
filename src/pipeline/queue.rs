//! Typed message queues connecting stages.
//!
//! A queue is a crossbeam channel of [`Message`]s split into one
//! [`QueueWriter`] and any number of [`QueueReader`] handles. The writer is not
//! clonable, so each queue has exactly one logical writer, and
//! [`QueueWriter::close`] consumes it: the end-of-stream marker can only be
//! written once and nothing can follow it.
//!
//! Reader handles are clones of the same receiver. They share one read
//! position, so cloning a reader does not duplicate the stream; it only
//! extends the queue's lifetime to the longest holder.

use crate::error::{PipelineError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A queue item: either a payload or the end-of-stream marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    /// Process data.
    Value(T),
    /// No more data will follow on this queue.
    EndOfStream,
}

impl<T> Message<T> {
    #[inline]
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Message::EndOfStream)
    }

    /// Take the payload, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Message::Value(value) => Some(value),
            Message::EndOfStream => None,
        }
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Message::Value(value) => Some(value),
            Message::EndOfStream => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Message<U> {
        match self {
            Message::Value(value) => Message::Value(f(value)),
            Message::EndOfStream => Message::EndOfStream,
        }
    }
}

/// How many messages a queue may hold before `write` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueueCapacity {
    /// Writes never block.
    #[default]
    Unbounded,
    /// Writes block while the queue holds this many messages.
    /// `Bounded(0)` is a rendezvous queue.
    Bounded(usize),
}

impl From<Option<usize>> for QueueCapacity {
    fn from(capacity: Option<usize>) -> Self {
        capacity.map_or(QueueCapacity::Unbounded, QueueCapacity::Bounded)
    }
}

#[derive(Debug, Default)]
struct QueueCounters {
    written: AtomicU64,
    read: AtomicU64,
    drained: AtomicU64,
    end_of_stream_sent: AtomicU64,
}

#[derive(Debug)]
struct QueueShared {
    name: String,
    counters: QueueCounters,
}

/// Point-in-time counters for one queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Queue name
    pub name: String,
    /// Payloads accepted by the queue
    pub written: u64,
    /// Payloads handed to a reader
    pub read: u64,
    /// Payloads discarded by [`QueueReader::drain`]
    pub drained: u64,
    /// End-of-stream markers written (0 or 1)
    pub end_of_stream_sent: u64,
}

impl QueueStats {
    /// Payloads written but neither read nor drained yet.
    pub fn pending(&self) -> u64 {
        self.written.saturating_sub(self.read + self.drained)
    }

    /// True once the writer has closed the queue.
    pub fn is_closed(&self) -> bool {
        self.end_of_stream_sent > 0
    }
}

fn snapshot(shared: &QueueShared) -> QueueStats {
    let c = &shared.counters;
    QueueStats {
        name: shared.name.clone(),
        written: c.written.load(Ordering::Acquire),
        read: c.read.load(Ordering::Acquire),
        drained: c.drained.load(Ordering::Acquire),
        end_of_stream_sent: c.end_of_stream_sent.load(Ordering::Acquire),
    }
}

/// Create a named queue.
pub fn channel<T>(
    name: impl Into<String>,
    capacity: QueueCapacity,
) -> (QueueWriter<T>, QueueReader<T>) {
    let (tx, rx) = match capacity {
        QueueCapacity::Unbounded => unbounded(),
        QueueCapacity::Bounded(cap) => bounded(cap),
    };
    let shared = Arc::new(QueueShared {
        name: name.into(),
        counters: QueueCounters::default(),
    });

    (
        QueueWriter {
            tx,
            shared: Arc::clone(&shared),
        },
        QueueReader { rx, shared },
    )
}

/// The single writing side of a queue.
pub struct QueueWriter<T> {
    tx: Sender<Message<T>>,
    shared: Arc<QueueShared>,
}

impl<T> QueueWriter<T> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Enqueue a payload, blocking while a bounded queue is full.
    ///
    /// Fails only when every reader handle is gone. The rejected payload is
    /// dropped before returning.
    pub fn write(&self, value: T) -> Result<()> {
        let counters = &self.shared.counters;
        counters.written.fetch_add(1, Ordering::AcqRel);
        match self.tx.send(Message::Value(value)) {
            Ok(()) => Ok(()),
            Err(_rejected) => {
                counters.written.fetch_sub(1, Ordering::AcqRel);
                Err(PipelineError::Disconnected(self.shared.name.clone()))
            }
        }
    }

    /// Write the end-of-stream marker and give up the writer.
    pub fn close(self) -> Result<()> {
        let counters = &self.shared.counters;
        counters.end_of_stream_sent.fetch_add(1, Ordering::AcqRel);
        match self.tx.send(Message::EndOfStream) {
            Ok(()) => {
                tracing::trace!(queue = %self.shared.name, "end of stream written");
                Ok(())
            }
            Err(_) => {
                counters.end_of_stream_sent.fetch_sub(1, Ordering::AcqRel);
                Err(PipelineError::Disconnected(self.shared.name.clone()))
            }
        }
    }

    pub fn stats(&self) -> QueueStats {
        snapshot(&self.shared)
    }
}

impl<T> fmt::Debug for QueueWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueWriter")
            .field("name", &self.shared.name)
            .finish()
    }
}

/// A reading handle onto a queue. Clones share the same read position.
pub struct QueueReader<T> {
    rx: Receiver<Message<T>>,
    shared: Arc<QueueShared>,
}

impl<T> Clone for QueueReader<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> QueueReader<T> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Block until a message is available and take it.
    ///
    /// A queue whose writer went away without closing it (its stage panicked)
    /// reads as end of stream.
    pub fn read(&self) -> Message<T> {
        match self.rx.recv() {
            Ok(message) => self.record(message),
            Err(_) => self.disconnected(),
        }
    }

    /// Take a message if one is ready.
    pub fn try_read(&self) -> Option<Message<T>> {
        match self.rx.try_recv() {
            Ok(message) => Some(self.record(message)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.disconnected()),
        }
    }

    /// Like [`read`](Self::read), but gives up after `timeout`.
    pub fn read_timeout(&self, timeout: Duration) -> Option<Message<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Some(self.record(message)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.disconnected()),
        }
    }

    /// Discard everything up to and including the end-of-stream marker.
    ///
    /// Returns the number of payloads dropped. Blocks until the writer closes
    /// the queue (or disconnects).
    pub fn drain(&self) -> usize {
        let mut discarded = 0;
        loop {
            match self.rx.recv() {
                Ok(Message::Value(value)) => {
                    drop(value);
                    discarded += 1;
                    self.shared.counters.drained.fetch_add(1, Ordering::AcqRel);
                }
                Ok(Message::EndOfStream) => break,
                Err(_) => {
                    tracing::warn!(
                        queue = %self.shared.name,
                        "Queue disconnected while draining"
                    );
                    break;
                }
            }
        }
        tracing::debug!(queue = %self.shared.name, discarded, "Queue drained");
        discarded
    }

    /// Messages currently buffered (including an end-of-stream marker).
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        snapshot(&self.shared)
    }

    fn record(&self, message: Message<T>) -> Message<T> {
        if let Message::Value(_) = message {
            self.shared.counters.read.fetch_add(1, Ordering::AcqRel);
        }
        message
    }

    fn disconnected(&self) -> Message<T> {
        tracing::warn!(
            queue = %self.shared.name,
            "Queue writer dropped without end of stream"
        );
        Message::EndOfStream
    }
}

impl<T> fmt::Debug for QueueReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueReader")
            .field("name", &self.shared.name)
            .field("len", &self.rx.len())
            .finish()
    }
}
