//! Non-maximum suppression over decoded candidates.

use crate::detect::result::BoundingBox;
use crate::error::{PerceptionError, Result};

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Greedy suppression returning the indices of kept boxes, best score first.
///
/// Boxes scoring below `score_threshold` never survive. Remaining boxes are
/// visited by descending score, with equal scores kept in input order, and a
/// box is kept only when its IoU with every box kept so far is at most
/// `iou_threshold`.
pub fn non_max_suppression(
    boxes: &[BoundingBox],
    scores: &[f32],
    score_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<usize>> {
    if boxes.len() != scores.len() {
        return Err(PerceptionError::config(format!(
            "suppression got {} boxes but {} scores",
            boxes.len(),
            scores.len()
        )));
    }

    let mut order: Vec<usize> = (0..boxes.len())
        .filter(|&i| scores[i] >= score_threshold)
        .collect();
    // sort_by is stable, so ties keep their input order
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let iou_threshold = f64::from(iou_threshold);
    let mut kept: Vec<usize> = Vec::with_capacity(order.len());
    for index in order {
        let overlaps = kept
            .iter()
            .any(|&k| boxes[k].iou(&boxes[index]) > iou_threshold);
        if !overlaps {
            kept.push(index);
        }
    }
    Ok(kept)
}
