use image::RgbImage;

use crate::detect::result::FrameSize;
use crate::detect::tensor::RawDetectionTensor;
use crate::error::Result;

/// Inference engine producing the raw detector tensor for a frame.
///
/// Implementations own the network and any pre-processing it needs. The frame
/// is borrowed for the duration of the call only.
pub trait InferenceBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Network input size; decoded boxes are rescaled from this space.
    fn input_size(&self) -> FrameSize;

    /// Run the network on one frame.
    fn infer(&mut self, frame: &RgbImage) -> Result<RawDetectionTensor>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
