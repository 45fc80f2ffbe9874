//! DepthSensor: producer of synthetic depth frames.

use crate::demo::DepthFrame;
use crate::pipeline::Producer;

/// Produces `max_frames` deterministic frames, then terminates.
#[derive(Debug)]
pub struct DepthSensor {
    index: usize,
    max_frames: usize,
    frame_pixels: usize,
    produced: usize,
}

impl DepthSensor {
    pub fn new(index: usize, max_frames: usize, frame_pixels: usize) -> Self {
        Self {
            index,
            max_frames,
            frame_pixels,
            produced: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn sample(&self, sequence: usize, pixel: usize) -> u16 {
        // Cheap ramp that varies per sensor, frame and pixel.
        ((self.index * 131 + sequence * 17 + pixel * 7) % 5000) as u16
    }
}

impl Producer for DepthSensor {
    type Output = DepthFrame;

    fn create(&mut self) -> DepthFrame {
        let sequence = self.produced;
        self.produced += 1;
        let depths = (0..self.frame_pixels)
            .map(|pixel| self.sample(sequence, pixel))
            .collect();
        tracing::trace!(sensor = self.index, sequence, "Depth frame captured");
        DepthFrame {
            sensor: self.index,
            sequence: sequence as u64,
            depths,
        }
    }

    fn terminate(&mut self) -> bool {
        self.produced >= self.max_frames
    }
}
