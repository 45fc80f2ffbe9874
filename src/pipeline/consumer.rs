//! Consumer stages: values in, nothing out.

use crate::pipeline::queue::{Message, QueueReader};
use crate::pipeline::stage::{PipelineStage, Stage, StageContext, StageRole};
use std::marker::PhantomData;

/// Per-iteration operation of a consumer.
pub trait Consumer: Send + 'static {
    type Input: Send + 'static;

    /// Take ownership of one value. Releasing it is the consumer's job; it must
    /// not be kept past the call.
    fn consume(&mut self, value: Self::Input);
}

/// Consumer backed by a closure.
pub struct FnConsumer<F, T> {
    consume: F,
    _marker: PhantomData<fn(T)>,
}

impl<F, T> FnConsumer<F, T>
where
    F: FnMut(T) + Send + 'static,
    T: Send + 'static,
{
    pub fn new(consume: F) -> Self {
        Self {
            consume,
            _marker: PhantomData,
        }
    }
}

impl<F, T> Consumer for FnConsumer<F, T>
where
    F: FnMut(T) + Send + 'static,
    T: Send + 'static,
{
    type Input = T;

    fn consume(&mut self, value: T) {
        (self.consume)(value)
    }
}

/// A consumer wired to an upstream queue.
pub struct ConsumerStage {
    stage: Stage,
}

impl ConsumerStage {
    pub fn new<C: Consumer>(
        name: impl Into<String>,
        consumer: C,
        input: QueueReader<C::Input>,
    ) -> Self {
        let stage = Stage::new(name, StageRole::Consumer, move |ctx| {
            run_consumer(consumer, input, ctx)
        });
        Self { stage }
    }
}

impl PipelineStage for ConsumerStage {
    fn stage(&self) -> &Stage {
        &self.stage
    }

    fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

fn run_consumer<C: Consumer>(mut consumer: C, input: QueueReader<C::Input>, ctx: &StageContext) {
    while let Message::Value(value) = input.read() {
        ctx.record_received(1);
        consumer.consume(value);
    }
    tracing::trace!(stage = ctx.name(), queue = input.name(), "End of stream reached");
}
