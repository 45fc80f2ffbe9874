//! One-to-one processor stages.
//!
//! Loop: read one value, [`Processor::process`] it, write the result. The end
//! of the input stream is not forwarded as data; the stage closes its own
//! output instead, so exactly one end-of-stream marker follows the results.

use crate::error::{PipelineError, Result};
use crate::pipeline::queue::{self, Message, QueueCapacity, QueueReader, QueueWriter};
use crate::pipeline::stage::{PipelineStage, Stage, StageContext, StageRole};
use std::marker::PhantomData;

/// Per-iteration operation of a one-to-one processor.
pub trait Processor: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Consume one input and produce the value to forward downstream.
    fn process(&mut self, input: Self::Input) -> Self::Output;
}

/// Processor backed by a closure.
pub struct MapProcessor<F, I, O> {
    map: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<F, I, O> MapProcessor<F, I, O>
where
    F: FnMut(I) -> O + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new(map: F) -> Self {
        Self {
            map,
            _marker: PhantomData,
        }
    }
}

impl<F, I, O> Processor for MapProcessor<F, I, O>
where
    F: FnMut(I) -> O + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn process(&mut self, input: I) -> O {
        (self.map)(input)
    }
}

/// A processor reading one queue and owning its output queue.
pub struct ProcessorStage<O> {
    stage: Stage,
    output: Option<QueueReader<O>>,
}

impl<O: Send + 'static> ProcessorStage<O> {
    pub fn new<P>(
        name: impl Into<String>,
        processor: P,
        input: QueueReader<P::Input>,
        capacity: QueueCapacity,
    ) -> Self
    where
        P: Processor<Output = O>,
    {
        let name = name.into();
        let (writer, output) = queue::channel(format!("{name}.out"), capacity);
        let stage = Stage::new(name, StageRole::Processor, move |ctx| {
            run_processor(processor, input, writer, ctx)
        });
        Self {
            stage,
            output: Some(output),
        }
    }

    /// Hand out the reader of the output queue. Only the first call succeeds.
    pub fn take_output(&mut self) -> Result<QueueReader<O>> {
        self.output
            .take()
            .ok_or_else(|| PipelineError::OutputTaken(self.stage.name().to_string()))
    }
}

impl<O: Send + 'static> PipelineStage for ProcessorStage<O> {
    fn stage(&self) -> &Stage {
        &self.stage
    }

    fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

fn run_processor<P: Processor>(
    mut processor: P,
    input: QueueReader<P::Input>,
    output: QueueWriter<P::Output>,
    ctx: &StageContext,
) {
    while let Message::Value(value) = input.read() {
        ctx.record_received(1);
        let result = processor.process(value);
        if let Err(err) = output.write(result) {
            tracing::warn!(stage = ctx.name(), %err, "Output lost its readers, processor stopping");
            ctx.record_released(1 + input.drain() as u64);
            break;
        }
        ctx.record_emitted();
    }

    // Hang up on upstream before announcing our own end of stream.
    drop(input);
    if let Err(err) = output.close() {
        tracing::debug!(stage = ctx.name(), %err, "End of stream not delivered");
    }
}
