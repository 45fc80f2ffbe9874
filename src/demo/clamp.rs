//! DepthClamp: one-to-one stage bounding every depth sample.

use crate::demo::DepthFrame;
use crate::pipeline::Processor;

/// Clamps samples into `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct DepthClamp {
    min: u16,
    max: u16,
}

impl DepthClamp {
    /// `min` must not exceed `max`; swapped bounds are reordered.
    pub fn new(min: u16, max: u16) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }
}

impl Processor for DepthClamp {
    type Input = DepthFrame;
    type Output = DepthFrame;

    fn process(&mut self, mut frame: DepthFrame) -> DepthFrame {
        for depth in frame.depths.iter_mut() {
            *depth = (*depth).clamp(self.min, self.max);
        }
        frame
    }
}
