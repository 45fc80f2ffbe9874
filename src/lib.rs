//! # staged-pipeline: thread-per-stage data pipelines
//!
//! Producers, processors and consumers run on dedicated threads and pass owned
//! values through typed queues. Each queue ends with exactly one end-of-stream
//! marker, which is the only shutdown signal: a stage stops when its input
//! ends and then closes its own output.
//!
//! ## Architecture
//!
//! - **Queues**: crossbeam channels carrying [`Message`]s, one writer and shared readers
//! - **Stages**: a `run` procedure on a named thread, moving through
//!   `NotStarted → Running → Completed`
//! - **Roles**: producer, consumer, one-to-one processor and many-to-one join
//! - **Driver**: [`Pipeline`] starts every stage and collects a [`PipelineReport`]
//!
//! ## Configuration
//!
//! The binary reads `pipeline.toml` (or a `.json` file) from the platform config
//! directory under `dev.staged-pipeline`, or from the path given as its first
//! argument.
//!
//! ## Example
//!
//! ```no_run
//! use staged_pipeline::{
//!     ConsumerStage, FnConsumer, FnProducer, MapProcessor, Pipeline, ProcessorStage,
//!     ProducerStage, QueueCapacity,
//! };
//!
//! let mut source = ProducerStage::new(
//!     "numbers",
//!     FnProducer::new(10, |i| i as u64),
//!     QueueCapacity::Bounded(4),
//! );
//! let mut square = ProcessorStage::new(
//!     "square",
//!     MapProcessor::new(|v: u64| v * v),
//!     source.take_output()?,
//!     QueueCapacity::Bounded(4),
//! );
//! let print = ConsumerStage::new(
//!     "print",
//!     FnConsumer::new(|v: u64| println!("{v}")),
//!     square.take_output()?,
//! );
//!
//! let report = Pipeline::new().with(source).with(square).with(print).run()?;
//! assert!(report.all_completed());
//! # Ok::<(), staged_pipeline::PipelineError>(())
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod pipeline;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result, ResultExt};
pub use pipeline::{
    channel, start_all, wait_all, Consumer, ConsumerStage, FnConsumer, FnJoin, FnProducer,
    IterProducer, JoinProcessor, JoinStage, MapProcessor, Message, Pipeline, PipelineReport,
    PipelineStage, Processor, ProcessorStage, Producer, ProducerStage, QueueCapacity, QueueReader,
    QueueStats, QueueWriter, Stage, StageContext, StageId, StageReport, StageRole, StageState,
};
