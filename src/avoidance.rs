//! Monocular distance estimate and camera-to-robot projection.
//!
//! Both are pinhole approximations driven by placeholder constants. None of
//! the values are calibrated; they live in [`CameraModel`] and
//! [`RobotTransform`] so deployments can replace them.

use crate::detect::{BoundingBox, FrameSize};
use crate::error::{PerceptionError, Result};

/// Physical constants of the camera and the observed human.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraModel {
    pub focal_length_mm: f64,
    /// Sensor height used by the distance estimate.
    pub distance_sensor_height_mm: f64,
    /// Sensor width used by the projection.
    pub projection_sensor_width_mm: f64,
    /// Sensor height used by the projection.
    pub projection_sensor_height_mm: f64,
    pub average_human_height: f64,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self {
            focal_length_mm: 16.0,
            distance_sensor_height_mm: 25.0,
            projection_sensor_width_mm: 24.0,
            projection_sensor_height_mm: 35.0,
            average_human_height: 175.0,
        }
    }
}

/// Homogeneous camera-to-robot transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RobotTransform {
    pub matrix: [[f64; 4]; 4],
}

impl Default for RobotTransform {
    fn default() -> Self {
        Self {
            matrix: [
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0, -2.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

impl RobotTransform {
    /// Apply to `[x, y, z, 1]` and keep the first three rows.
    pub fn apply(&self, x: f64, y: f64, z: f64) -> [f64; 3] {
        let v = [x, y, z, 1.0];
        let mut out = [0.0; 3];
        for (row, value) in self.matrix.iter().take(3).zip(out.iter_mut()) {
            *value = row.iter().zip(v.iter()).map(|(a, b)| a * b).sum();
        }
        out
    }
}

/// Position in the robot frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RobotPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Distance and position estimator handed to the pipeline.
#[derive(Clone, Debug, Default)]
pub struct HumanAvoidance {
    camera: CameraModel,
    transform: RobotTransform,
}

impl HumanAvoidance {
    pub fn new(camera: CameraModel, transform: RobotTransform) -> Self {
        Self { camera, transform }
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn transform(&self) -> &RobotTransform {
        &self.transform
    }

    /// Distance to a human whose box is `box_height_px` tall in a frame
    /// `frame_height_px` tall.
    ///
    /// The unit handling is kept exactly as the formula was first written:
    /// `average_human_height * focal_length / height_on_sensor / 100`.
    pub fn estimate_distance(&self, box_height_px: i32, frame_height_px: u32) -> Result<f64> {
        if frame_height_px == 0 {
            return Err(PerceptionError::arithmetic(
                "distance estimate with zero frame height",
            ));
        }
        if box_height_px <= 0 {
            return Err(PerceptionError::arithmetic(format!(
                "distance estimate with box height {}",
                box_height_px
            )));
        }

        let height_on_sensor = (self.camera.distance_sensor_height_mm * f64::from(box_height_px))
            / f64::from(frame_height_px);
        if height_on_sensor == 0.0 {
            return Err(PerceptionError::arithmetic("projected height on sensor is zero"));
        }
        let distance = (self.camera.average_human_height * self.camera.focal_length_mm)
            / height_on_sensor;
        finite(distance / 100.0, "distance")
    }

    /// Project a box at depth `z` into the robot frame.
    pub fn camera_to_robot(
        &self,
        z: f64,
        bbox: &BoundingBox,
        frame_size: FrameSize,
    ) -> Result<RobotPosition> {
        if frame_size.width == 0 || frame_size.height == 0 {
            return Err(PerceptionError::arithmetic(format!(
                "projection with degenerate frame {}x{}",
                frame_size.width, frame_size.height
            )));
        }

        // pixel centres use integer halving
        let center_x = i64::from(bbox.left) + i64::from(bbox.width / 2);
        let center_y = i64::from(bbox.top) + i64::from(bbox.height / 2);
        let offset_x = center_x - i64::from(frame_size.width / 2);
        let offset_y = center_y - i64::from(frame_size.height / 2);

        let x = (self.camera.projection_sensor_width_mm * offset_x as f64)
            / f64::from(frame_size.height);
        let y = (self.camera.projection_sensor_height_mm * offset_y as f64)
            / f64::from(frame_size.width);

        let [x, y, z] = self.transform.apply(x, y, z);
        Ok(RobotPosition {
            x: finite(x, "robot x")?,
            y: finite(y, "robot y")?,
            z: finite(z, "robot z")?,
        })
    }
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PerceptionError::arithmetic(format!("{} is not finite", what)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_follows_literal_formula() -> Result<()> {
        let avoider = HumanAvoidance::default();
        let d = avoider.estimate_distance(365, 480)?;
        // 25 * 365 / 480 = 19.0104 mm on sensor; 175 * 16 / 19.0104 / 100
        let expected = 175.0 * 16.0 / (25.0 * 365.0 / 480.0) / 100.0;
        assert!((d - expected).abs() < 1e-9);
        assert!((d - 1.473).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn short_box_rounds_to_one_metre() -> Result<()> {
        let d = HumanAvoidance::default().estimate_distance(35, 40)?;
        assert_eq!(d.round(), 1.0);
        Ok(())
    }

    #[test]
    fn distance_shrinks_as_box_grows() -> Result<()> {
        let avoider = HumanAvoidance::default();
        let far = avoider.estimate_distance(100, 480)?;
        let near = avoider.estimate_distance(400, 480)?;
        assert!(near < far);
        assert!((far / near - 4.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn zero_heights_are_arithmetic_errors() {
        let avoider = HumanAvoidance::default();
        assert!(matches!(
            avoider.estimate_distance(0, 480),
            Err(PerceptionError::Arithmetic(_))
        ));
        assert!(matches!(
            avoider.estimate_distance(120, 0),
            Err(PerceptionError::Arithmetic(_))
        ));
        assert!(matches!(
            avoider.estimate_distance(-3, 480),
            Err(PerceptionError::Arithmetic(_))
        ));
    }

    #[test]
    fn projection_applies_fixed_translation() -> Result<()> {
        let avoider = HumanAvoidance::default();
        let bbox = BoundingBox::new(0, 10, 10, 0);
        let frame = FrameSize::new(10, 10);

        let first = avoider.camera_to_robot(1.0, &bbox, frame)?;
        // x = 24 * (5 - 5) / 10 = 0, y = 35 * (10 - 5) / 10 = 17.5
        assert_eq!(
            first,
            RobotPosition {
                x: 1.0,
                y: 18.5,
                z: -1.0
            }
        );

        let second = avoider.camera_to_robot(1.0, &bbox, frame)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn projection_of_centred_box_is_pure_translation() -> Result<()> {
        let avoider = HumanAvoidance::default();
        let bbox = BoundingBox::new(270, 140, 100, 200);
        let pos = avoider.camera_to_robot(3.0, &bbox, FrameSize::new(640, 480))?;
        assert_eq!(pos, RobotPosition { x: 1.0, y: 1.0, z: 1.0 });
        Ok(())
    }

    #[test]
    fn projection_rejects_degenerate_frames() {
        let avoider = HumanAvoidance::default();
        let bbox = BoundingBox::new(0, 0, 10, 10);
        for frame in [FrameSize::new(0, 10), FrameSize::new(10, 0)] {
            assert!(matches!(
                avoider.camera_to_robot(1.0, &bbox, frame),
                Err(PerceptionError::Arithmetic(_))
            ));
        }
    }

    #[test]
    fn custom_transform_is_used() {
        let transform = RobotTransform {
            matrix: [
                [0.0, 1.0, 0.0, 0.0],
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 2.0, 0.5],
                [0.0, 0.0, 0.0, 1.0],
            ],
        };
        assert_eq!(transform.apply(3.0, 4.0, 5.0), [4.0, 3.0, 10.5]);
    }
}
