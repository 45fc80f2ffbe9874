//! Pipeline driver: owns a set of wired stages and runs them to completion.
//!
//! Stages are wired by the caller (each downstream stage is built from the
//! output reader of its upstream), then handed to a [`Pipeline`] which starts
//! them in insertion order and waits for all of them. Nothing here changes the
//! stage protocol; driving stages by hand with [`start_all`] / [`wait_all`]
//! works the same way.

use crate::error::{PipelineError, Result};
use crate::pipeline::id::StageId;
use crate::pipeline::stage::{start_all, wait_all, PipelineStage, StageReport, StageState};
use serde::Serialize;
use std::time::Instant;

/// Reports for every stage of a pipeline, in insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// Report of the first stage with this name.
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn all_completed(&self) -> bool {
        self.stages.iter().all(StageReport::is_completed)
    }

    /// Names of the stages whose `run` panicked.
    pub fn panicked(&self) -> impl Iterator<Item = &str> {
        self.stages
            .iter()
            .filter(|s| s.panic.is_some())
            .map(|s| s.name.as_str())
    }

    pub fn total_received(&self) -> u64 {
        self.stages.iter().map(|s| s.received).sum()
    }

    pub fn total_emitted(&self) -> u64 {
        self.stages.iter().map(|s| s.emitted).sum()
    }

    pub fn total_released(&self) -> u64 {
        self.stages.iter().map(|s| s.released).sum()
    }

    /// Pretty-printed JSON form of the report.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Serialization(format!("Failed to serialize report: {}", e)))
    }
}

/// Owns boxed stages of any role and output type.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn PipelineStage>>,
    started_at: Option<Instant>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a wired stage. Stages start in the order they are added.
    pub fn add<S: PipelineStage + 'static>(&mut self, stage: S) -> StageId {
        let id = stage.stage().id();
        tracing::trace!(stage = stage.stage().name(), %id, "Stage added to pipeline");
        self.stages.push(Box::new(stage));
        id
    }

    /// Builder-style [`add`](Self::add).
    pub fn with<S: PipelineStage + 'static>(mut self, stage: S) -> Self {
        self.add(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.stage().name()).collect()
    }

    /// Start every stage, stopping at the first one that fails to start.
    ///
    /// Stages started before the failure keep running; call [`wait`](Self::wait)
    /// to collect them.
    pub fn start(&mut self) -> Result<()> {
        tracing::info!(stages = self.stages.len(), "Starting pipeline");
        self.started_at = Some(Instant::now());
        start_all(self.stages.iter_mut().map(|s| s.as_mut()))
    }

    /// Wait for every stage and return the combined report.
    ///
    /// All stages are waited on even when one of them fails; the first error
    /// is returned and [`report`](Self::report) still describes every stage.
    pub fn wait(&mut self) -> Result<PipelineReport> {
        let outcome = wait_all(self.stages.iter_mut().map(|s| s.as_mut()));
        let report = self.report();

        let elapsed_ms = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        match &outcome {
            Ok(()) => tracing::info!(
                stages = report.stages.len(),
                emitted = report.total_emitted(),
                released = report.total_released(),
                elapsed_ms,
                "Pipeline finished"
            ),
            Err(err) => tracing::error!(%err, elapsed_ms, "Pipeline finished with errors"),
        }

        outcome.map(|()| report)
    }

    /// [`start`](Self::start) followed by [`wait`](Self::wait).
    pub fn run(&mut self) -> Result<PipelineReport> {
        if let Err(err) = self.start() {
            // Collect whatever did start so no thread outlives the pipeline.
            for stage in self.stages.iter_mut() {
                if stage.stage().state() == StageState::NotStarted {
                    continue;
                }
                if let Err(wait_err) = stage.wait() {
                    tracing::warn!(
                        stage = stage.stage().name(),
                        %wait_err,
                        "Stage failed while the pipeline was aborting"
                    );
                }
            }
            return Err(err);
        }
        self.wait()
    }

    pub fn report(&self) -> PipelineReport {
        PipelineReport {
            stages: self.stages.iter().map(|s| s.report()).collect(),
        }
    }
}
