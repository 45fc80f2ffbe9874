//! Many-to-one processor stages.
//!
//! Each iteration reads exactly one message from every input, in input order,
//! and only then decides what to do (a read barrier per iteration):
//!
//! - all inputs carried a value: the whole batch goes to
//!   [`JoinProcessor::process`] and the result is written out;
//! - at least one input reached end of stream: every value already taken in
//!   this iteration is released, each input that is still live is drained
//!   through its own end-of-stream marker, and the loop ends.
//!
//! Either way the output is closed exactly once. Draining the live inputs is
//! what lets their upstream writers finish when the streams have different
//! lengths, and it guarantees nothing queued behind the shutdown point is
//! left unreleased.

use crate::error::{PipelineError, Result};
use crate::pipeline::queue::{self, Message, QueueCapacity, QueueReader, QueueWriter};
use crate::pipeline::stage::{PipelineStage, Stage, StageContext, StageRole};
use std::marker::PhantomData;

/// Per-iteration operation of a many-to-one processor.
pub trait JoinProcessor: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Combine one value per input, given in input order.
    fn process(&mut self, values: Vec<Self::Input>) -> Self::Output;
}

/// Join processor backed by a closure.
pub struct FnJoin<F, I, O> {
    combine: F,
    _marker: PhantomData<fn(Vec<I>) -> O>,
}

impl<F, I, O> FnJoin<F, I, O>
where
    F: FnMut(Vec<I>) -> O + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new(combine: F) -> Self {
        Self {
            combine,
            _marker: PhantomData,
        }
    }
}

impl<F, I, O> JoinProcessor for FnJoin<F, I, O>
where
    F: FnMut(Vec<I>) -> O + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn process(&mut self, values: Vec<I>) -> O {
        (self.combine)(values)
    }
}

/// A fan-in stage over a fixed, ordered set of input queues.
pub struct JoinStage<O> {
    stage: Stage,
    output: Option<QueueReader<O>>,
    input_count: usize,
}

impl<O: Send + 'static> JoinStage<O> {
    /// Wire a join over `inputs`. The number of inputs is fixed from here on.
    pub fn new<J>(
        name: impl Into<String>,
        processor: J,
        inputs: Vec<QueueReader<J::Input>>,
        capacity: QueueCapacity,
    ) -> Result<Self>
    where
        J: JoinProcessor<Output = O>,
    {
        let name = name.into();
        if inputs.is_empty() {
            return Err(PipelineError::NoInputs(name));
        }

        let input_count = inputs.len();
        let (writer, output) = queue::channel(format!("{name}.out"), capacity);
        let stage = Stage::new(name, StageRole::Join, move |ctx| {
            run_join(processor, inputs, writer, ctx)
        });
        Ok(Self {
            stage,
            output: Some(output),
            input_count,
        })
    }

    /// Hand out the reader of the output queue. Only the first call succeeds.
    pub fn take_output(&mut self) -> Result<QueueReader<O>> {
        self.output
            .take()
            .ok_or_else(|| PipelineError::OutputTaken(self.stage.name().to_string()))
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }
}

impl<O: Send + 'static> PipelineStage for JoinStage<O> {
    fn stage(&self) -> &Stage {
        &self.stage
    }

    fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

fn run_join<J: JoinProcessor>(
    mut processor: J,
    inputs: Vec<QueueReader<J::Input>>,
    output: QueueWriter<J::Output>,
    ctx: &StageContext,
) {
    loop {
        let batch: Vec<Message<J::Input>> = inputs.iter().map(QueueReader::read).collect();
        let taken = batch.iter().filter(|m| !m.is_end_of_stream()).count();
        ctx.record_received(taken as u64);

        if taken < batch.len() {
            shut_down_inputs(&inputs, batch, ctx);
            break;
        }

        let values: Vec<J::Input> = batch.into_iter().filter_map(Message::into_value).collect();
        let combined = processor.process(values);
        if let Err(err) = output.write(combined) {
            tracing::warn!(stage = ctx.name(), %err, "Output lost its readers, join stopping");
            ctx.record_released(1);
            for input in &inputs {
                ctx.record_released(input.drain() as u64);
            }
            break;
        }
        ctx.record_emitted();
    }

    if let Err(err) = output.close() {
        tracing::debug!(stage = ctx.name(), %err, "End of stream not delivered");
    }
}

/// Release the values taken in the final iteration and drain their queues.
///
/// Inputs that delivered end of stream in this iteration are left alone: their
/// marker has already been consumed and reading again would block forever.
fn shut_down_inputs<T>(inputs: &[QueueReader<T>], batch: Vec<Message<T>>, ctx: &StageContext) {
    let ended: Vec<&str> = inputs
        .iter()
        .zip(&batch)
        .filter(|(_, m)| m.is_end_of_stream())
        .map(|(input, _)| input.name())
        .collect();
    tracing::debug!(stage = ctx.name(), ?ended, "Input reached end of stream, shutting down");

    for (position, (input, message)) in inputs.iter().zip(batch).enumerate() {
        if let Message::Value(value) = message {
            drop(value);
            let drained = input.drain();
            ctx.record_released(1 + drained as u64);
            tracing::debug!(
                stage = ctx.name(),
                position,
                queue = input.name(),
                drained,
                "Released live input"
            );
        }
    }
}
