//! Human detection and avoidance for mobile robots.
//!
//! A YOLOv5-style detector output is decoded into candidate boxes, reduced
//! with greedy non-maximum suppression, and every surviving detection gets a
//! monocular distance estimate and a position in the robot frame.
//!
//! # Module Structure
//!
//! - `detect`: raw tensor decoding, NMS, inference backends
//! - `avoidance`: distance estimate and camera-to-robot projection
//! - `pipeline`: per-frame decode, suppress, estimate chain
//! - `ingest`: frame sources (still images, video files, V4L2 cameras)
//! - `render`: annotated overlay
//! - `config`, `classes`, `error`: configuration, class list, error type

pub mod avoidance;
pub mod classes;
pub mod config;
pub mod detect;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod render;

pub use avoidance::{CameraModel, HumanAvoidance, RobotPosition, RobotTransform};
pub use classes::ClassNames;
pub use config::AvoidanceConfig;
pub use detect::{
    load_backend, BoundingBox, Detection, FrameSize, InferenceBackend, RawDetectionTensor,
    SelectedDetection,
};
pub use error::{PerceptionError, Result};
pub use ingest::{Frame, FrameSource};
pub use pipeline::{FramePipeline, FrameReport, PerceivedObject, PipelineStage};
pub use render::OverlayRenderer;
