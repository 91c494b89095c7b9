use image::RgbImage;

use crate::detect::backend::InferenceBackend;
use crate::detect::result::FrameSize;
use crate::detect::tensor::RawDetectionTensor;
use crate::error::Result;

/// Backend that replays a preset tensor for every frame.
///
/// Used for tests and for `stub://` model paths.
pub struct FixedOutputBackend {
    input_size: FrameSize,
    output: RawDetectionTensor,
    calls: u64,
}

impl FixedOutputBackend {
    pub fn new(input_size: FrameSize, output: RawDetectionTensor) -> Self {
        Self {
            input_size,
            output,
            calls: 0,
        }
    }

    /// A backend whose every row is empty (objectness 0).
    pub fn empty(input_size: FrameSize, rows: usize, num_classes: usize) -> Result<Self> {
        let dims = num_classes + 5;
        let output = RawDetectionTensor::new(vec![0.0; rows * dims], rows, dims)?;
        Ok(Self::new(input_size, output))
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl InferenceBackend for FixedOutputBackend {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn input_size(&self) -> FrameSize {
        self.input_size
    }

    fn infer(&mut self, _frame: &RgbImage) -> Result<RawDetectionTensor> {
        self.calls += 1;
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_the_same_tensor() -> Result<()> {
        let mut backend = FixedOutputBackend::empty(FrameSize::new(640, 640), 4, 2)?;
        let frame = RgbImage::new(8, 6);

        let first = backend.infer(&frame)?;
        let second = backend.infer(&frame)?;
        assert_eq!(first, second);
        assert_eq!(first.rows(), 4);
        assert_eq!(first.num_classes(), 2);
        assert_eq!(backend.calls(), 2);
        Ok(())
    }
}
