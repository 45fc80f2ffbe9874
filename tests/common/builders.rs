//! Test data builders for wiring pipelines

use super::{DropLedger, Tracked};
use staged_pipeline::{FnProducer, ProducerStage, QueueCapacity};

/// Builder for producer stages that emit ledger-tracked payloads
pub struct TrackedSourceBuilder {
    name: String,
    ledger: DropLedger,
    count: usize,
    first_id: u64,
    capacity: QueueCapacity,
}

impl TrackedSourceBuilder {
    pub fn new(name: &str, ledger: &DropLedger) -> Self {
        Self {
            name: name.to_string(),
            ledger: ledger.clone(),
            count: 3,
            first_id: 0,
            capacity: QueueCapacity::Unbounded,
        }
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Ids run from `first_id` upwards
    pub fn first_id(mut self, first_id: u64) -> Self {
        self.first_id = first_id;
        self
    }

    pub fn capacity(mut self, capacity: QueueCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> ProducerStage<Tracked> {
        let ledger = self.ledger;
        let first_id = self.first_id;
        ProducerStage::new(
            self.name,
            FnProducer::new(self.count, move |i| ledger.payload(first_id + i as u64)),
            self.capacity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::collect_values;
    use staged_pipeline::PipelineStage;

    #[test]
    fn test_tracked_source_builder() {
        let ledger = DropLedger::new();
        let mut source = TrackedSourceBuilder::new("src", &ledger)
            .count(2)
            .first_id(10)
            .build();
        let output = source.take_output().unwrap();

        source.start().unwrap();
        let ids: Vec<u64> = collect_values(&output).iter().map(|t| t.id).collect();
        source.wait().unwrap();

        assert_eq!(ids, vec![10, 11]);
        assert_eq!(ledger.created(), 2);
    }
}
