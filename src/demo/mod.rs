//! Sample sensor pipeline.
//!
//! Several depth sensors feed a clamp stage each; a tracker joins one frame
//! per sensor into a scene and a renderer consumes the scenes.
//!
//! ```text
//! [DepthSensor 0] ──► [DepthClamp 0] ──┐
//! [DepthSensor 1] ──► [DepthClamp 1] ──┼──► [SceneTracker] ──► [SceneRenderer]
//! [DepthSensor 2] ──► [DepthClamp 2] ──┘
//! ```
//!
//! Sensors may produce different numbers of frames. The tracker stops at the
//! shortest stream and drains the rest, so the renderer sees
//! `min(frames_per_sensor)` scenes.

pub mod clamp;
pub mod renderer;
pub mod sensor;
pub mod tracker;

pub use clamp::DepthClamp;
pub use renderer::{RenderedScenes, SceneRenderer};
pub use sensor::DepthSensor;
pub use tracker::SceneTracker;

use crate::config::DemoConfig;
use crate::error::Result;
use crate::pipeline::{
    ConsumerStage, JoinStage, Pipeline, ProcessorStage, ProducerStage, QueueCapacity,
};
use serde::Serialize;

/// One depth image from one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthFrame {
    pub sensor: usize,
    pub sequence: u64,
    pub depths: Vec<u16>,
}

/// Frames from every sensor combined into one scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedScene {
    pub sequence: u64,
    /// Sensor indices in input order
    pub sensors: Vec<usize>,
    pub mean_depth: f64,
}

/// A wired demo pipeline and the handle that counts rendered scenes.
pub struct DemoPipeline {
    pub pipeline: Pipeline,
    pub rendered: RenderedScenes,
}

impl DemoPipeline {
    /// Scenes the renderer will see once the pipeline has run.
    pub fn expected_scenes(config: &DemoConfig) -> usize {
        config.frames_per_sensor.iter().copied().min().unwrap_or(0)
    }
}

/// Wire sensors, clamps, tracker and renderer. Nothing is started.
pub fn build(config: &DemoConfig, capacity: QueueCapacity) -> Result<DemoPipeline> {
    let mut pipeline = Pipeline::new();
    let mut clamped = Vec::with_capacity(config.frames_per_sensor.len());

    for (index, &frames) in config.frames_per_sensor.iter().enumerate() {
        let mut sensor = ProducerStage::new(
            format!("sensor-{index}"),
            DepthSensor::new(index, frames, config.frame_pixels),
            capacity,
        );
        let mut clamp = ProcessorStage::new(
            format!("clamp-{index}"),
            DepthClamp::new(config.depth_min, config.depth_max),
            sensor.take_output()?,
            capacity,
        );
        clamped.push(clamp.take_output()?);
        pipeline.add(sensor);
        pipeline.add(clamp);
    }

    let mut tracker = JoinStage::new("tracker", SceneTracker::new(), clamped, capacity)?;
    let rendered = RenderedScenes::default();
    let renderer = ConsumerStage::new(
        "renderer",
        SceneRenderer::new(rendered.clone()),
        tracker.take_output()?,
    );
    pipeline.add(tracker);
    pipeline.add(renderer);

    tracing::debug!(
        sensors = config.frames_per_sensor.len(),
        stages = pipeline.len(),
        ?capacity,
        "Demo pipeline wired"
    );
    Ok(DemoPipeline { pipeline, rendered })
}
