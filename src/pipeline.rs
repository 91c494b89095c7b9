//! Per-frame decode, suppression and estimation chain.
//!
//! Each call to [`FramePipeline::process`] walks
//! `Idle -> Decoding -> Suppressing -> Estimating -> Done` and returns a
//! [`FrameReport`]. Nothing is carried from one frame to the next.

use std::fmt;
use std::time::Duration;

use crate::avoidance::{HumanAvoidance, RobotPosition};
use crate::config::{AvoidanceConfig, AvoidanceSettings, ThresholdSettings};
use crate::detect::{
    decode, non_max_suppression, BoundingBox, DecodeParams, FrameSize, RawDetectionTensor,
    SelectedDetection,
};
use crate::error::{PerceptionError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Decoding,
    Suppressing,
    Estimating,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Decoding => "decoding",
            PipelineStage::Suppressing => "suppressing",
            PipelineStage::Estimating => "estimating",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result for one selected detection.
#[derive(Clone, Debug, PartialEq)]
pub struct PerceivedObject {
    pub selection: SelectedDetection,
    /// `None` when the estimate hit an arithmetic error.
    pub distance_m: Option<f64>,
    pub position: Option<RobotPosition>,
    pub is_human: bool,
    pub too_close: bool,
}

impl PerceivedObject {
    pub fn bbox(&self) -> &BoundingBox {
        &self.selection.detection.bbox
    }

    pub fn class_id(&self) -> usize {
        self.selection.detection.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.selection.detection.confidence
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub objects: Vec<PerceivedObject>,
    /// Rows that passed both thresholds.
    pub candidates: usize,
    /// Selections whose distance or position could not be computed.
    pub skipped: usize,
    /// Inference time reported by the caller, if measured.
    pub inference_time: Option<Duration>,
}

impl FrameReport {
    pub fn humans(&self) -> impl Iterator<Item = &PerceivedObject> {
        self.objects.iter().filter(|o| o.is_human)
    }

    /// Closest human with a valid distance estimate.
    pub fn nearest_human(&self) -> Option<&PerceivedObject> {
        self.humans()
            .filter(|o| o.distance_m.is_some())
            .min_by(|a, b| {
                let da = a.distance_m.unwrap_or(f64::MAX);
                let db = b.distance_m.unwrap_or(f64::MAX);
                da.total_cmp(&db)
            })
    }

    pub fn any_too_close(&self) -> bool {
        self.objects.iter().any(|o| o.is_human && o.too_close)
    }
}

/// Decode, suppress and estimate for one frame at a time.
pub struct FramePipeline {
    thresholds: ThresholdSettings,
    avoidance_settings: AvoidanceSettings,
    num_classes: usize,
    input_size: FrameSize,
    avoider: HumanAvoidance,
    stage: PipelineStage,
}

impl FramePipeline {
    pub fn new(
        thresholds: ThresholdSettings,
        avoidance_settings: AvoidanceSettings,
        num_classes: usize,
        input_size: FrameSize,
        avoider: HumanAvoidance,
    ) -> Self {
        Self {
            thresholds,
            avoidance_settings,
            num_classes,
            input_size,
            avoider,
            stage: PipelineStage::Idle,
        }
    }

    /// Build a pipeline from loaded configuration.
    ///
    /// The human class id must name one of the `num_classes` classes, or no
    /// detection could ever raise the proximity warning.
    pub fn from_config(config: &AvoidanceConfig, num_classes: usize) -> Result<Self> {
        if config.avoidance.human_class_id >= num_classes {
            return Err(PerceptionError::config(format!(
                "human class id {} is outside the {} loaded classes",
                config.avoidance.human_class_id, num_classes
            )));
        }
        Ok(Self::new(
            config.thresholds,
            config.avoidance,
            num_classes,
            FrameSize::new(config.model.input_width, config.model.input_height),
            HumanAvoidance::new(config.camera, config.transform),
        ))
    }

    /// Stage reached by the last call: `Done` after a successful frame, the
    /// failing stage otherwise.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn avoider(&self) -> &HumanAvoidance {
        &self.avoider
    }

    pub fn process(
        &mut self,
        tensor: &RawDetectionTensor,
        frame_size: FrameSize,
    ) -> Result<FrameReport> {
        self.enter(PipelineStage::Decoding);
        let params = DecodeParams {
            objectness_threshold: self.thresholds.objectness,
            class_score_threshold: self.thresholds.class_score,
            num_classes: self.num_classes,
            input_size: self.input_size,
            frame_size,
        };
        let detections = decode(tensor, &params)?;

        self.enter(PipelineStage::Suppressing);
        let boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bbox).collect();
        let scores: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
        let kept = non_max_suppression(
            &boxes,
            &scores,
            self.thresholds.nms_score,
            self.thresholds.nms_iou,
        )?;

        self.enter(PipelineStage::Estimating);
        let mut report = FrameReport {
            candidates: detections.len(),
            ..FrameReport::default()
        };
        for (rank, &index) in kept.iter().enumerate() {
            let selection = SelectedDetection {
                id: rank + 1,
                detection: detections[index],
            };
            let is_human = selection.detection.class_id == self.avoidance_settings.human_class_id;
            let (distance_m, position) = match self.estimate(&selection, frame_size) {
                Ok((distance, position)) => (Some(distance), Some(position)),
                Err(err) if err.is_recoverable() => {
                    log::warn!("skipping estimate for detection #{}: {}", selection.id, err);
                    report.skipped += 1;
                    (None, None)
                }
                Err(err) => return Err(err),
            };
            let object = PerceivedObject {
                selection,
                distance_m,
                position,
                is_human,
                too_close: distance_m
                    .is_some_and(|d| d < self.avoidance_settings.warning_distance_m),
            };
            report.objects.push(object);
        }

        self.enter(PipelineStage::Done);
        log::debug!(
            "frame {}x{}: {} candidates, {} selected, {} skipped",
            frame_size.width,
            frame_size.height,
            report.candidates,
            report.objects.len(),
            report.skipped
        );
        Ok(report)
    }

    fn estimate(
        &self,
        selection: &SelectedDetection,
        frame_size: FrameSize,
    ) -> Result<(f64, RobotPosition)> {
        let bbox = &selection.detection.bbox;
        let distance = self
            .avoider
            .estimate_distance(bbox.height, frame_size.height)?;
        let position = self.avoider.camera_to_robot(distance, bbox, frame_size)?;
        Ok((distance, position))
    }

    fn enter(&mut self, stage: PipelineStage) {
        log::trace!("pipeline: {} -> {}", self.stage, stage);
        self.stage = stage;
    }
}
