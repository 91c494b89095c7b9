//! Still-image frame source.

use image::{ImageError, RgbImage};

use super::{Frame, SourceStats};
use crate::error::{PerceptionError, Result};

/// Yields the decoded image once, then reports exhaustion.
pub struct ImageFileSource {
    path: String,
    image: Option<RgbImage>,
    frame_count: u64,
}

impl ImageFileSource {
    pub fn open(path: &str) -> Result<Self> {
        let image = image::open(path)
            .map_err(|err| match err {
                ImageError::IoError(e) => PerceptionError::io(format!("cannot open image {}", path), e),
                other => PerceptionError::decode(format!("cannot decode image {}: {}", path, other)),
            })?
            .to_rgb8();
        Ok(Self {
            path: path.to_string(),
            image: Some(image),
            frame_count: 0,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        if let Some(image) = &self.image {
            log::info!(
                "ImageFileSource: connected to {} ({}x{})",
                self.path,
                image.width(),
                image.height()
            );
        }
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(image) = self.image.take() else {
            return Ok(None);
        };
        self.frame_count += 1;
        Ok(Some(Frame {
            image,
            sequence: self.frame_count,
        }))
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            input: self.path.clone(),
        }
    }
}
