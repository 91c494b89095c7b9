//! Synthetic frames for `stub://` inputs.

use image::{Rgb, RgbImage};

use super::{Frame, SourceStats};
use crate::error::Result;

pub struct SyntheticSource {
    input: String,
    width: u32,
    height: u32,
    frame_count: u64,
    /// Advances every 50 frames to vary the scene.
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(input: &str, width: u32, height: u32) -> Self {
        Self {
            input: input.to_string(),
            width,
            height,
            frame_count: 0,
            scene_state: 0,
        }
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.input,
            self.width,
            self.height
        );
        Ok(())
    }

    /// Never runs out.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frame_count += 1;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let shift = self.frame_count + u64::from(self.scene_state);
        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            let base = u64::from(x) + u64::from(y) * u64::from(self.width) + shift;
            Rgb([
                (base % 256) as u8,
                ((base + 85) % 256) as u8,
                ((base + 170) % 256) as u8,
            ])
        });
        Ok(Some(Frame {
            image,
            sequence: self.frame_count,
        }))
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            input: self.input.clone(),
        }
    }
}
