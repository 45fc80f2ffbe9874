//! Producer stages: values out, nothing in.
//!
//! Loop: check [`Producer::terminate`]; if it is false, [`Producer::create`]
//! one value and write it. When the loop ends the output queue is closed,
//! which writes the single end-of-stream marker.

use crate::error::{PipelineError, Result};
use crate::pipeline::queue::{self, QueueCapacity, QueueReader, QueueWriter};
use crate::pipeline::stage::{PipelineStage, Stage, StageContext, StageRole};
use std::marker::PhantomData;

/// Per-iteration operations of a producer.
pub trait Producer: Send + 'static {
    type Output: Send + 'static;

    /// Manufacture the next value. Only called after `terminate` returned false.
    fn create(&mut self) -> Self::Output;

    /// Stop condition, checked before every `create`.
    fn terminate(&mut self) -> bool;
}

/// Producer that calls a closure with the running index until `limit` values exist.
pub struct FnProducer<F, T> {
    create: F,
    produced: usize,
    limit: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> FnProducer<F, T>
where
    F: FnMut(usize) -> T + Send + 'static,
    T: Send + 'static,
{
    pub fn new(limit: usize, create: F) -> Self {
        Self {
            create,
            produced: 0,
            limit,
            _marker: PhantomData,
        }
    }
}

impl<F, T> Producer for FnProducer<F, T>
where
    F: FnMut(usize) -> T + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn create(&mut self) -> T {
        let value = (self.create)(self.produced);
        self.produced += 1;
        value
    }

    fn terminate(&mut self) -> bool {
        self.produced >= self.limit
    }
}

/// Producer that replays an iterator.
pub struct IterProducer<I: Iterator> {
    iter: I,
    next: Option<I::Item>,
}

impl<I> IterProducer<I>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    pub fn new(values: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: values.into_iter(),
            next: None,
        }
    }
}

impl<I> Producer for IterProducer<I>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    type Output = I::Item;

    fn create(&mut self) -> I::Item {
        match self.next.take().or_else(|| self.iter.next()) {
            Some(value) => value,
            None => panic!("IterProducer::create called after the iterator ran out"),
        }
    }

    fn terminate(&mut self) -> bool {
        if self.next.is_none() {
            self.next = self.iter.next();
        }
        self.next.is_none()
    }
}

/// A producer wired to its own output queue.
pub struct ProducerStage<T> {
    stage: Stage,
    output: Option<QueueReader<T>>,
}

impl<T: Send + 'static> ProducerStage<T> {
    pub fn new<P>(name: impl Into<String>, producer: P, capacity: QueueCapacity) -> Self
    where
        P: Producer<Output = T>,
    {
        let name = name.into();
        let (writer, output) = queue::channel(format!("{name}.out"), capacity);
        let stage = Stage::new(name, StageRole::Producer, move |ctx| {
            run_producer(producer, writer, ctx)
        });
        Self {
            stage,
            output: Some(output),
        }
    }

    /// Hand out the reader of the output queue for wiring downstream stages.
    ///
    /// The stage keeps no reader of its own: once every handed-out clone is
    /// dropped, the next write fails and the producer stops.
    pub fn take_output(&mut self) -> Result<QueueReader<T>> {
        self.output
            .take()
            .ok_or_else(|| PipelineError::OutputTaken(self.stage.name().to_string()))
    }
}

impl<T: Send + 'static> PipelineStage for ProducerStage<T> {
    fn stage(&self) -> &Stage {
        &self.stage
    }

    fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

fn run_producer<P: Producer>(
    mut producer: P,
    output: QueueWriter<P::Output>,
    ctx: &StageContext,
) {
    while !producer.terminate() {
        let value = producer.create();
        if let Err(err) = output.write(value) {
            tracing::warn!(stage = ctx.name(), %err, "Output lost its readers, producer stopping");
            ctx.record_released(1);
            break;
        }
        tracing::trace!(stage = ctx.name(), "Value produced");
        ctx.record_emitted();
    }

    if let Err(err) = output.close() {
        tracing::debug!(stage = ctx.name(), %err, "End of stream not delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::Message;
    use crate::pipeline::stage::StageState;

    fn collect<T>(reader: &QueueReader<T>) -> Vec<T> {
        let mut values = Vec::new();
        while let Message::Value(v) = reader.read() {
            values.push(v);
        }
        values
    }

    #[test]
    fn test_fn_producer_counts_to_limit() {
        let mut producer = FnProducer::new(3, |i| i * 2);
        let mut values = Vec::new();
        while !producer.terminate() {
            values.push(producer.create());
        }
        assert_eq!(values, vec![0, 2, 4]);
    }

    #[test]
    fn test_iter_producer_terminates_on_exhaustion() {
        let mut producer = IterProducer::new(vec!["a", "b"]);
        assert!(!producer.terminate());
        assert!(!producer.terminate());
        assert_eq!(producer.create(), "a");
        assert!(!producer.terminate());
        assert_eq!(producer.create(), "b");
        assert!(producer.terminate());
    }

    #[test]
    fn test_producer_stage_writes_values_then_one_end_of_stream() {
        let mut stage = ProducerStage::new(
            "numbers",
            FnProducer::new(4, |i| i as u32),
            QueueCapacity::Unbounded,
        );
        let output = stage.take_output().unwrap();
        assert_eq!(output.name(), "numbers.out");
        assert!(matches!(
            stage.take_output(),
            Err(PipelineError::OutputTaken(ref n)) if n == "numbers"
        ));

        stage.start().unwrap();
        assert_eq!(collect(&output), vec![0, 1, 2, 3]);
        stage.wait().unwrap();

        let stats = output.stats();
        assert_eq!(stats.written, 4);
        assert_eq!(stats.end_of_stream_sent, 1);
        assert!(output.is_empty());

        let report = stage.report();
        assert_eq!(report.state, StageState::Completed);
        assert_eq!(report.emitted, 4);
        assert_eq!(report.role, StageRole::Producer);
    }

    #[test]
    fn test_immediately_terminating_producer_only_closes() {
        let mut stage = ProducerStage::new(
            "empty",
            IterProducer::new(Vec::<u8>::new()),
            QueueCapacity::Bounded(1),
        );
        let output = stage.take_output().unwrap();
        stage.start().unwrap();
        stage.wait().unwrap();

        assert_eq!(output.read(), Message::EndOfStream);
        assert_eq!(output.stats().written, 0);
    }

    #[test]
    fn test_producer_stops_when_reader_is_dropped() {
        let mut stage = ProducerStage::new(
            "endless",
            FnProducer::new(usize::MAX, |i| i),
            QueueCapacity::Bounded(1),
        );
        let output = stage.take_output().unwrap();
        stage.start().unwrap();

        assert_eq!(output.read(), Message::Value(0));
        drop(output);

        // The only reader is gone, so the blocked write fails and the loop ends.
        stage.wait().unwrap();
        let report = stage.report();
        assert_eq!(report.state, StageState::Completed);
        assert_eq!(report.released, 1);
        assert!(report.emitted >= 1);
    }
}
