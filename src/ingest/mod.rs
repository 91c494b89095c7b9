//! Frame sources.
//!
//! The source is chosen from the input string the same way for every entry
//! point:
//! - paths containing `/dev/video` open a V4L2 camera (feature: ingest-v4l2)
//! - `.jpg`, `.jpeg`, `.png` and `.bmp` files are still images
//! - `stub://...` gives synthetic frames (testing)
//! - anything else is a local video file (feature: ingest-file-ffmpeg)
//!
//! A source that cannot be opened fails immediately. `next_frame` returns
//! `Ok(None)` once the source is exhausted; a still image yields one frame.

#[cfg(feature = "ingest-v4l2")]
mod camera;
mod image_file;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod synthetic;
#[cfg(feature = "ingest-file-ffmpeg")]
mod video_file;

use image::RgbImage;

use crate::config::SourceSettings;
use crate::detect::FrameSize;
use crate::error::{PerceptionError, Result};

#[cfg(feature = "ingest-v4l2")]
pub use camera::CameraSource;
pub use image_file::ImageFileSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-file-ffmpeg")]
pub use video_file::VideoFileSource;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// One captured frame.
pub struct Frame {
    pub image: RgbImage,
    /// 1-based capture sequence number within the source.
    pub sequence: u64,
}

impl Frame {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.image.width(), self.image.height())
    }
}

/// Kind of input, derived from the input string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Camera,
    Image,
    Synthetic,
    Video,
}

impl SourceKind {
    pub fn detect(input: &str) -> Self {
        if input.starts_with("stub://") {
            return SourceKind::Synthetic;
        }
        if input.contains("/dev/video") {
            return SourceKind::Camera;
        }
        let lower = input.to_ascii_lowercase();
        let is_image = std::path::Path::new(&lower)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext));
        if is_image {
            SourceKind::Image
        } else {
            SourceKind::Video
        }
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub input: String,
}

/// Frame source selected from an input string.
pub struct FrameSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Image(ImageFileSource),
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Video(VideoFileSource),
    #[cfg(feature = "ingest-v4l2")]
    Camera(CameraSource),
}

impl FrameSource {
    pub fn open(input: &str, settings: &SourceSettings) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(PerceptionError::config("input source must not be empty"));
        }
        let kind = SourceKind::detect(input);
        log::info!("opening {:?} source {}", kind, input);
        let backend = match kind {
            SourceKind::Image => SourceBackend::Image(ImageFileSource::open(input)?),
            SourceKind::Synthetic => SourceBackend::Synthetic(SyntheticSource::new(
                input,
                settings.width,
                settings.height,
            )),
            SourceKind::Video => Self::open_video(input, settings)?,
            SourceKind::Camera => Self::open_camera(input, settings)?,
        };
        let mut source = Self { backend };
        source.connect()?;
        Ok(source)
    }

    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            SourceBackend::Image(source) => source.connect(),
            SourceBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::Video(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::Camera(source) => source.connect(),
        }
    }

    #[cfg(feature = "ingest-file-ffmpeg")]
    fn open_video(input: &str, _settings: &SourceSettings) -> Result<SourceBackend> {
        Ok(SourceBackend::Video(VideoFileSource::open(input)?))
    }

    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    fn open_video(_input: &str, _settings: &SourceSettings) -> Result<SourceBackend> {
        Err(PerceptionError::config(
            "video input requires the ingest-file-ffmpeg feature",
        ))
    }

    #[cfg(feature = "ingest-v4l2")]
    fn open_camera(input: &str, settings: &SourceSettings) -> Result<SourceBackend> {
        Ok(SourceBackend::Camera(CameraSource::open(input, settings)?))
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    fn open_camera(_input: &str, _settings: &SourceSettings) -> Result<SourceBackend> {
        Err(PerceptionError::config(
            "camera input requires the ingest-v4l2 feature",
        ))
    }

    /// Capture the next frame, or `None` when the source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            SourceBackend::Image(source) => source.next_frame(),
            SourceBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::Video(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::Camera(source) => source.next_frame(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Image(source) => source.stats(),
            SourceBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::Video(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::Camera(source) => source.stats(),
        }
    }
}
