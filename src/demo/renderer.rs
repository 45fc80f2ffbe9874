//! SceneRenderer: consumer at the end of the demo pipeline.

use crate::demo::TrackedScene;
use crate::pipeline::Consumer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared count of scenes rendered so far.
#[derive(Debug, Clone, Default)]
pub struct RenderedScenes(Arc<AtomicU64>);

impl RenderedScenes {
    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

/// "Renders" a scene by logging it.
#[derive(Debug)]
pub struct SceneRenderer {
    rendered: RenderedScenes,
}

impl SceneRenderer {
    pub fn new(rendered: RenderedScenes) -> Self {
        Self { rendered }
    }
}

impl Consumer for SceneRenderer {
    type Input = TrackedScene;

    fn consume(&mut self, scene: TrackedScene) {
        tracing::debug!(
            sequence = scene.sequence,
            sensors = scene.sensors.len(),
            mean_depth = scene.mean_depth,
            "Scene rendered"
        );
        self.rendered.increment();
    }
}
