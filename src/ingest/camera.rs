//! V4L2 camera source.
//!
//! Requests packed RGB at the configured size. Devices that refuse RGB are
//! accepted when they fall back to YUYV, which is converted in memory.

use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{Frame, SourceStats};
use crate::config::SourceSettings;
use crate::error::{PerceptionError, Result};

pub struct CameraSource {
    device_path: String,
    width: u32,
    height: u32,
    target_fps: u32,
    state: Option<CameraState>,
    pixel_format: PixelFormat,
    frame_count: u64,
}

#[self_referencing]
struct CameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl CameraSource {
    pub fn open(device_path: &str, settings: &SourceSettings) -> Result<Self> {
        Ok(Self {
            device_path: device_path.to_string(),
            width: settings.width,
            height: settings.height,
            target_fps: settings.target_fps,
            state: None,
            pixel_format: PixelFormat::Rgb24,
            frame_count: 0,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device_err = |what: &str, e: std::io::Error| {
            PerceptionError::io(format!("{} {}", what, self.device_path), e)
        };

        let mut device = v4l::Device::with_path(&self.device_path)
            .map_err(|e| device_err("open v4l2 device", e))?;
        let mut format = device
            .format()
            .map_err(|e| device_err("read v4l2 format of", e))?;
        format.width = self.width;
        format.height = self.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.device_path,
                    err
                );
                device
                    .format()
                    .map_err(|e| device_err("read v4l2 format of", e))?
            }
        };
        self.pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            PerceptionError::config(format!(
                "{} delivers unsupported pixel format {}",
                self.device_path, format.fourcc
            ))
        })?;

        if self.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.device_path,
                    err
                );
            }
        }

        self.width = format.width;
        self.height = format.height;

        let state = CameraStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
            },
        }
        .try_build()
        .map_err(|e| {
            PerceptionError::io(format!("create v4l2 buffer stream for {}", self.device_path), e)
        })?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{}, {:?})",
            self.device_path,
            self.width,
            self.height,
            self.pixel_format
        );
        Ok(())
    }

    /// Cameras never report exhaustion; capture failures are errors.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| PerceptionError::config("v4l2 device not connected"))?;
        let (width, height, format) = (self.width, self.height, self.pixel_format);
        let image = state
            .with_mut(|fields| {
                let (buf, _meta) = fields.stream.next()?;
                Ok::<_, std::io::Error>(normalize_to_rgb(buf, width, height, format))
            })
            .map_err(|e| {
                PerceptionError::io(format!("capture frame from {}", self.device_path), e)
            })??;

        self.frame_count += 1;
        Ok(Some(Frame {
            image,
            sequence: self.frame_count,
        }))
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            input: self.device_path.clone(),
        }
    }
}
