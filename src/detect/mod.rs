mod backend;
mod backends;
pub mod decode;
pub mod nms;
mod result;
mod tensor;

pub use backend::InferenceBackend;
pub use backends::FixedOutputBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use decode::{decode, DecodeParams};
pub use nms::non_max_suppression;
pub use result::{BoundingBox, Detection, FrameSize, SelectedDetection};
pub use tensor::RawDetectionTensor;

use crate::config::ModelSettings;
use crate::error::Result;

/// Candidate slots of a 640x640 YOLOv5 head (3 scales x 3 anchors).
pub const YOLOV5_ROWS: usize = 25_200;

/// Build the inference backend named by the model path.
///
/// `stub://` paths give a backend that never detects anything; every other
/// path is treated as a local ONNX file.
pub fn load_backend(
    settings: &ModelSettings,
    num_classes: usize,
) -> Result<Box<dyn InferenceBackend>> {
    let input_size = FrameSize::new(settings.input_width, settings.input_height);
    if settings.path.starts_with("stub://") {
        log::info!("using stub inference backend for {}", settings.path);
        return Ok(Box::new(FixedOutputBackend::empty(
            input_size,
            YOLOV5_ROWS,
            num_classes,
        )?));
    }

    #[cfg(feature = "backend-tract")]
    {
        Ok(Box::new(TractBackend::new(&settings.path, input_size)?))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        Err(crate::error::PerceptionError::config(
            "ONNX inference requires the backend-tract feature",
        ))
    }
}
