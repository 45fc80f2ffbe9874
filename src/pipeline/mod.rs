//! Staged pipeline building blocks.
//!
//! A pipeline is a static directed graph of stages connected by typed queues.
//! Every stage runs its loop on a dedicated thread; values move through queues
//! by ownership and every queue ends with exactly one end-of-stream marker.
//!
//! # Architecture
//!
//! ```text
//! [Producer] ──► [Processor] ──┐
//! [Producer] ──► [Processor] ──┼──► [JoinStage] ──► [Consumer]
//! [Producer] ──► [Processor] ──┘
//! ```
//!
//! # Design
//!
//! - **One writer per queue**: `QueueWriter` is not `Clone` and `close` consumes it.
//! - **Shared readers**: `QueueReader` clones share the read position and keep the queue alive.
//! - **Handed-out outputs**: stage wrappers give their output reader away once (`take_output`)
//!   and keep none, so a writer notices when its downstream is gone.
//! - **Shutdown by marker**: no cancel API; stages stop when their input ends.
//! - **Join barrier**: a many-to-one stage reads one value from every input per iteration.

pub mod consumer;
pub mod executor;
pub mod id;
pub mod join;
pub mod processor;
pub mod producer;
pub mod queue;
pub mod stage;

pub use consumer::{Consumer, ConsumerStage, FnConsumer};
pub use executor::{Pipeline, PipelineReport};
pub use id::StageId;
pub use join::{FnJoin, JoinProcessor, JoinStage};
pub use processor::{MapProcessor, Processor, ProcessorStage};
pub use producer::{FnProducer, IterProducer, Producer, ProducerStage};
pub use queue::{channel, Message, QueueCapacity, QueueReader, QueueStats, QueueWriter};
pub use stage::{
    start_all, wait_all, PipelineStage, Stage, StageContext, StageReport, StageRole, StageState,
};
