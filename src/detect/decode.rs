//! Detection decoder: raw tensor rows to candidate detections.

use crate::detect::result::{BoundingBox, Detection, FrameSize};
use crate::detect::tensor::{RawDetectionTensor, CLASS_SCORE_OFFSET, OBJECTNESS_INDEX};
use crate::error::{PerceptionError, Result};

/// Parameters of a single decode pass.
#[derive(Clone, Copy, Debug)]
pub struct DecodeParams {
    /// Rows with objectness below this are dropped.
    pub objectness_threshold: f32,
    /// Rows whose best class score is not above this are dropped.
    pub class_score_threshold: f32,
    /// Number of classes the class-name list describes.
    pub num_classes: usize,
    /// Network input size the tensor coordinates refer to.
    pub input_size: FrameSize,
    /// Source frame the boxes are rescaled to.
    pub frame_size: FrameSize,
}

/// Decode every row of `tensor` into candidate detections.
///
/// Overlapping candidates are expected and left for suppression.
pub fn decode(tensor: &RawDetectionTensor, params: &DecodeParams) -> Result<Vec<Detection>> {
    if tensor.num_classes() != params.num_classes {
        return Err(PerceptionError::config(format!(
            "detector emits {} class scores but the class list has {} entries",
            tensor.num_classes(),
            params.num_classes
        )));
    }
    if params.input_size.width == 0 || params.input_size.height == 0 {
        return Err(PerceptionError::config("network input size must be non-zero"));
    }

    let x_factor = params.frame_size.width as f32 / params.input_size.width as f32;
    let y_factor = params.frame_size.height as f32 / params.input_size.height as f32;

    let mut detections = Vec::new();
    for row in tensor.iter_rows() {
        let objectness = row[OBJECTNESS_INDEX];
        if objectness < params.objectness_threshold {
            continue;
        }

        let Some((class_id, best_score)) = best_class(&row[CLASS_SCORE_OFFSET..]) else {
            continue;
        };
        if best_score <= params.class_score_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let bbox = BoundingBox::new(
            ((cx - 0.5 * w) * x_factor) as i32,
            ((cy - 0.5 * h) * y_factor) as i32,
            (w * x_factor) as i32,
            (h * y_factor) as i32,
        );
        detections.push(Detection {
            class_id,
            confidence: objectness,
            bbox,
        });
    }

    Ok(detections)
}

/// Left-to-right argmax; the first index wins on ties.
fn best_class(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (id, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((id, score)),
        }
    }
    best
}
