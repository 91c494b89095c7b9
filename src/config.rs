use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::avoidance::{CameraModel, RobotTransform};
use crate::detect::nms::{DEFAULT_IOU_THRESHOLD, DEFAULT_SCORE_THRESHOLD};

const DEFAULT_MODEL_PATH: &str = "models/yolov5s.onnx";
const DEFAULT_CLASSES_PATH: &str = "models/coco.names";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_OBJECTNESS: f32 = 0.45;
const DEFAULT_CLASS_SCORE: f32 = 0.5;
const DEFAULT_WARNING_DISTANCE_M: f64 = 1.5;
const DEFAULT_HUMAN_CLASS_ID: usize = 0;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_SOURCE_FPS: u32 = 30;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AvoidanceConfigFile {
    model: Option<ModelConfigFile>,
    thresholds: Option<ThresholdConfigFile>,
    camera: Option<CameraConfigFile>,
    robot: Option<RobotConfigFile>,
    avoidance: Option<AvoidanceSectionFile>,
    source: Option<SourceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    path: Option<String>,
    classes_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ThresholdConfigFile {
    objectness: Option<f32>,
    class_score: Option<f32>,
    nms_score: Option<f32>,
    nms_iou: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    focal_length_mm: Option<f64>,
    distance_sensor_height_mm: Option<f64>,
    projection_sensor_width_mm: Option<f64>,
    projection_sensor_height_mm: Option<f64>,
    average_human_height: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RobotConfigFile {
    transform: Option<[[f64; 4]; 4]>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AvoidanceSectionFile {
    warning_distance_m: Option<f64>,
    human_class_id: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AvoidanceConfig {
    pub model: ModelSettings,
    pub thresholds: ThresholdSettings,
    pub camera: CameraModel,
    pub transform: RobotTransform,
    pub avoidance: AvoidanceSettings,
    pub source: SourceSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Local ONNX file, or `stub://...` for the empty stub backend.
    pub path: String,
    pub classes_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ThresholdSettings {
    pub objectness: f32,
    pub class_score: f32,
    pub nms_score: f32,
    pub nms_iou: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct AvoidanceSettings {
    /// Humans closer than this are flagged as too close.
    pub warning_distance_m: f64,
    pub human_class_id: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SourceSettings {
    /// Requested capture size for cameras and synthetic sources.
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            objectness: DEFAULT_OBJECTNESS,
            class_score: DEFAULT_CLASS_SCORE,
            nms_score: DEFAULT_SCORE_THRESHOLD,
            nms_iou: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl Default for AvoidanceSettings {
    fn default() -> Self {
        Self {
            warning_distance_m: DEFAULT_WARNING_DISTANCE_M,
            human_class_id: DEFAULT_HUMAN_CLASS_ID,
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_SOURCE_WIDTH,
            height: DEFAULT_SOURCE_HEIGHT,
            target_fps: DEFAULT_SOURCE_FPS,
        }
    }
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self::from_file(AvoidanceConfigFile::default())
    }
}

impl AvoidanceConfig {
    /// Load from `HUMAN_AVOIDANCE_CONFIG` (if set), then apply environment
    /// overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HUMAN_AVOIDANCE_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like [`AvoidanceConfig::load`] with an explicit file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AvoidanceConfigFile) -> Self {
        let model_file = file.model.unwrap_or_default();
        let model = ModelSettings {
            path: model_file
                .path
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
            classes_path: model_file
                .classes_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLASSES_PATH)),
            input_width: model_file.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
            input_height: model_file.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
        };

        let defaults = ThresholdSettings::default();
        let thresholds = file
            .thresholds
            .map(|t| ThresholdSettings {
                objectness: t.objectness.unwrap_or(defaults.objectness),
                class_score: t.class_score.unwrap_or(defaults.class_score),
                nms_score: t.nms_score.unwrap_or(defaults.nms_score),
                nms_iou: t.nms_iou.unwrap_or(defaults.nms_iou),
            })
            .unwrap_or(defaults);

        let defaults = CameraModel::default();
        let camera = file
            .camera
            .map(|c| CameraModel {
                focal_length_mm: c.focal_length_mm.unwrap_or(defaults.focal_length_mm),
                distance_sensor_height_mm: c
                    .distance_sensor_height_mm
                    .unwrap_or(defaults.distance_sensor_height_mm),
                projection_sensor_width_mm: c
                    .projection_sensor_width_mm
                    .unwrap_or(defaults.projection_sensor_width_mm),
                projection_sensor_height_mm: c
                    .projection_sensor_height_mm
                    .unwrap_or(defaults.projection_sensor_height_mm),
                average_human_height: c
                    .average_human_height
                    .unwrap_or(defaults.average_human_height),
            })
            .unwrap_or(defaults);

        let transform = file
            .robot
            .and_then(|r| r.transform)
            .map(|matrix| RobotTransform { matrix })
            .unwrap_or_default();

        let defaults = AvoidanceSettings::default();
        let avoidance = file
            .avoidance
            .map(|a| AvoidanceSettings {
                warning_distance_m: a.warning_distance_m.unwrap_or(defaults.warning_distance_m),
                human_class_id: a.human_class_id.unwrap_or(defaults.human_class_id),
            })
            .unwrap_or(defaults);

        let defaults = SourceSettings::default();
        let source = file
            .source
            .map(|s| SourceSettings {
                width: s.width.unwrap_or(defaults.width),
                height: s.height.unwrap_or(defaults.height),
                target_fps: s.target_fps.unwrap_or(defaults.target_fps),
            })
            .unwrap_or(defaults);

        Self {
            model,
            thresholds,
            camera,
            transform,
            avoidance,
            source,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("HUMAN_AVOIDANCE_MODEL") {
            if !path.trim().is_empty() {
                self.model.path = path;
            }
        }
        if let Ok(path) = std::env::var("HUMAN_AVOIDANCE_CLASSES") {
            if !path.trim().is_empty() {
                self.model.classes_path = PathBuf::from(path);
            }
        }
        if let Some(value) = env_number::<f32>("HUMAN_AVOIDANCE_OBJECTNESS")? {
            self.thresholds.objectness = value;
        }
        if let Some(value) = env_number::<f32>("HUMAN_AVOIDANCE_CLASS_SCORE")? {
            self.thresholds.class_score = value;
        }
        if let Some(value) = env_number::<f32>("HUMAN_AVOIDANCE_NMS_IOU")? {
            self.thresholds.nms_iou = value;
        }
        if let Some(value) = env_number::<f64>("HUMAN_AVOIDANCE_WARNING_DISTANCE")? {
            self.avoidance.warning_distance_m = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.model.path.trim().is_empty() {
            return Err(anyhow!("model path must not be empty"));
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(anyhow!("model input size must be non-zero"));
        }
        for (name, value) in [
            ("objectness", self.thresholds.objectness),
            ("class_score", self.thresholds.class_score),
            ("nms_score", self.thresholds.nms_score),
            ("nms_iou", self.thresholds.nms_iou),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("threshold {} must be within 0..=1, got {}", name, value));
            }
        }
        for (name, value) in [
            ("focal_length_mm", self.camera.focal_length_mm),
            ("distance_sensor_height_mm", self.camera.distance_sensor_height_mm),
            ("projection_sensor_width_mm", self.camera.projection_sensor_width_mm),
            ("projection_sensor_height_mm", self.camera.projection_sensor_height_mm),
            ("average_human_height", self.camera.average_human_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(anyhow!("camera {} must be positive, got {}", name, value));
            }
        }
        if self
            .transform
            .matrix
            .iter()
            .flatten()
            .any(|v| !v.is_finite())
        {
            return Err(anyhow!("robot transform must contain finite values"));
        }
        if !(self.avoidance.warning_distance_m.is_finite()
            && self.avoidance.warning_distance_m >= 0.0)
        {
            return Err(anyhow!("warning distance must be a non-negative number"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source size must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AvoidanceConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

/// Numeric override; unset or blank variables leave the value alone.
fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number", key)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let cfg = AvoidanceConfig::default();
        assert_eq!(cfg.model.input_width, 640);
        assert_eq!(cfg.model.input_height, 640);
        assert_eq!(cfg.thresholds.objectness, 0.45);
        assert_eq!(cfg.thresholds.class_score, 0.5);
        assert_eq!(cfg.thresholds.nms_score, 0.5);
        assert_eq!(cfg.thresholds.nms_iou, 0.45);
        assert_eq!(cfg.camera, CameraModel::default());
        assert_eq!(cfg.transform, RobotTransform::default());
        assert_eq!(cfg.avoidance.warning_distance_m, 1.5);
        assert_eq!(cfg.source.width, 640);
        assert_eq!(cfg.source.height, 480);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() -> Result<()> {
        let file: AvoidanceConfigFile = toml::from_str(
            r#"
            [thresholds]
            nms_iou = 0.4

            [camera]
            focal_length_mm = 8.0
            "#,
        )?;
        let cfg = AvoidanceConfig::from_file(file);
        assert_eq!(cfg.thresholds.nms_iou, 0.4);
        assert_eq!(cfg.thresholds.objectness, 0.45);
        assert_eq!(cfg.camera.focal_length_mm, 8.0);
        assert_eq!(cfg.camera.distance_sensor_height_mm, 25.0);
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = AvoidanceConfig::default();
        cfg.thresholds.nms_iou = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = AvoidanceConfig::default();
        cfg.camera.focal_length_mm = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = AvoidanceConfig::default();
        cfg.transform.matrix[0][3] = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: std::result::Result<AvoidanceConfigFile, _> =
            toml::from_str("[thresholds]\nconfidence = 0.3\n");
        assert!(parsed.is_err());
    }
}
