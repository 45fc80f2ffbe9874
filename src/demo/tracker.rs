//! SceneTracker: many-to-one stage combining one frame per sensor.

use crate::demo::{DepthFrame, TrackedScene};
use crate::pipeline::JoinProcessor;

#[derive(Debug, Default)]
pub struct SceneTracker {
    scenes: u64,
}

impl SceneTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JoinProcessor for SceneTracker {
    type Input = DepthFrame;
    type Output = TrackedScene;

    fn process(&mut self, frames: Vec<DepthFrame>) -> TrackedScene {
        let samples: usize = frames.iter().map(|f| f.depths.len()).sum();
        let total: u64 = frames
            .iter()
            .flat_map(|f| f.depths.iter())
            .map(|&d| u64::from(d))
            .sum();
        let mean_depth = if samples == 0 {
            0.0
        } else {
            total as f64 / samples as f64
        };

        let scene = TrackedScene {
            sequence: self.scenes,
            sensors: frames.iter().map(|f| f.sensor).collect(),
            mean_depth,
        };
        self.scenes += 1;
        // `frames` is released here; only the summary travels on.
        scene
    }
}
