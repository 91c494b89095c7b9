//! Local video file source decoded with FFmpeg.

use ffmpeg_next as ffmpeg;
use image::RgbImage;

use super::{Frame, SourceStats};
use crate::error::{PerceptionError, Result};

pub struct VideoFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    eof_sent: bool,
}

fn ffmpeg_err(what: &str, err: ffmpeg::Error) -> PerceptionError {
    PerceptionError::decode(format!("{}: {}", what, err))
}

impl VideoFileSource {
    pub fn open(path: &str) -> Result<Self> {
        std::fs::metadata(path)
            .map_err(|e| PerceptionError::io(format!("cannot open video {}", path), e))?;

        ffmpeg::init().map_err(|e| ffmpeg_err("initialize ffmpeg", e))?;
        let input = ffmpeg::format::input(&path)
            .map_err(|e| ffmpeg_err(&format!("failed to open video '{}'", path), e))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| PerceptionError::decode(format!("{} has no video track", path)))?;
        let stream_index = stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| ffmpeg_err("load video decoder parameters", e))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| ffmpeg_err("open ffmpeg video decoder", e))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| ffmpeg_err("create ffmpeg scaler", e))?;

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!(
            "VideoFileSource: connected to {} ({}x{}, ffmpeg)",
            self.path,
            self.decoder.width(),
            self.decoder.height()
        );
        Ok(())
    }

    /// Decode the next frame; `None` once the decoder is drained.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.eof_sent {
                log::info!(
                    "VideoFileSource: {} exhausted after {} frames",
                    self.path,
                    self.frame_count
                );
                return Ok(None);
            }

            match self.next_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .map_err(|e| ffmpeg_err("send packet to ffmpeg decoder", e))?,
                None => {
                    self.decoder
                        .send_eof()
                        .map_err(|e| ffmpeg_err("flush ffmpeg decoder", e))?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let stream_index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet)
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .map_err(|e| ffmpeg_err("scale frame to RGB", e))?;
        let image = frame_to_image(&rgb_frame)?;

        self.frame_count += 1;
        Ok(Frame {
            image,
            sequence: self.frame_count,
        })
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            input: self.path.clone(),
        }
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let pixels = if stride == row_bytes {
        data.get(..row_bytes * height as usize)
            .ok_or_else(|| PerceptionError::decode("ffmpeg frame is shorter than expected"))?
            .to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(
                data.get(start..start + row_bytes)
                    .ok_or_else(|| PerceptionError::decode("ffmpeg frame row is out of bounds"))?,
            );
        }
        pixels
    };

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| PerceptionError::decode("ffmpeg frame size mismatch"))
}
