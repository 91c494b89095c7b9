#![cfg(feature = "backend-tract")]

use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::InferenceBackend;
use crate::detect::result::FrameSize;
use crate::detect::tensor::RawDetectionTensor;
use crate::error::{PerceptionError, Result};

/// Tract-based backend for YOLOv5-style ONNX detectors.
///
/// Frames are resized to the network input without letterboxing, scaled to
/// `0..1` and laid out as a `1x3xHxW` RGB tensor.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: FrameSize,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: FrameSize) -> Result<Self> {
        let model_path = model_path.as_ref();
        std::fs::metadata(model_path).map_err(|e| {
            PerceptionError::io(format!("cannot read model {}", model_path.display()), e)
        })?;

        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|e| {
                PerceptionError::decode(format!(
                    "failed to load ONNX model from {}: {}",
                    model_path.display(),
                    e
                ))
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(
                        1,
                        3,
                        input_size.height as usize,
                        input_size.width as usize
                    ),
                ),
            )
            .map_err(|e| PerceptionError::decode(format!("failed to set input fact: {}", e)))?
            .into_optimized()
            .map_err(|e| PerceptionError::decode(format!("failed to optimize ONNX model: {}", e)))?
            .into_runnable()
            .map_err(|e| {
                PerceptionError::decode(format!("failed to build runnable ONNX model: {}", e))
            })?;

        log::info!(
            "TractBackend: loaded {} ({}x{} input)",
            model_path.display(),
            input_size.width,
            input_size.height
        );
        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &RgbImage) -> Tensor {
        let (w, h) = (self.input_size.width, self.input_size.height);
        let resized = image::imageops::resize(frame, w, h, FilterType::Triangle);
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, h as usize, w as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        input.into_tensor()
    }

    fn extract_tensor(&self, outputs: TVec<TValue>) -> Result<RawDetectionTensor> {
        let output = outputs
            .first()
            .ok_or_else(|| PerceptionError::decode("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| PerceptionError::decode(format!("model output was not f32: {}", e)))?;
        let shape = view.shape().to_vec();
        RawDetectionTensor::from_shape(&shape, view.iter().copied().collect())
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_size(&self) -> FrameSize {
        self.input_size
    }

    fn infer(&mut self, frame: &RgbImage) -> Result<RawDetectionTensor> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(PerceptionError::decode("cannot run inference on an empty frame"));
        }
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PerceptionError::decode(format!("ONNX inference failed: {}", e)))?;
        self.extract_tensor(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = RgbImage::new(self.input_size.width, self.input_size.height);
        self.infer(&blank).map(|_| ())
    }
}
