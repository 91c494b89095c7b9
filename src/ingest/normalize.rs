//! Conversion of camera buffers to packed RGB.

use image::RgbImage;

use crate::error::{PerceptionError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    /// Packed 4:2:2, `Y0 U Y1 V` per pixel pair.
    Yuyv,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(Self::Rgb24),
            b"YUYV" => Some(Self::Yuyv),
            _ => None,
        }
    }
}

pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<RgbImage> {
    let rgb = match format {
        PixelFormat::Rgb24 => {
            let expected = frame_len(width, height, 3)?;
            // drivers may pad the last buffer
            pixels
                .get(..expected)
                .ok_or_else(|| length_mismatch("RGB", expected, pixels.len()))?
                .to_vec()
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height)?,
    };
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| PerceptionError::decode("normalized frame size mismatch"))
}

fn frame_len(width: u32, height: u32, bytes_per_pixel: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(bytes_per_pixel))
        .ok_or_else(|| PerceptionError::decode("frame dimensions overflow"))
}

fn length_mismatch(kind: &str, expected: usize, got: usize) -> PerceptionError {
    PerceptionError::decode(format!(
        "{} frame length mismatch: expected {}, got {}",
        kind, expected, got
    ))
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width % 2 != 0 {
        return Err(PerceptionError::decode("YUYV frames need an even width"));
    }
    let expected = frame_len(width, height, 2)?;
    let packed = pixels
        .get(..expected)
        .ok_or_else(|| length_mismatch("YUYV", expected, pixels.len()))?;

    let mut rgb = Vec::with_capacity(frame_len(width, height, 3)?);
    for chunk in packed.chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            rgb.push(clamp_to_u8(y + 1.402_f32 * v));
            rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
            rgb.push(clamp_to_u8(y + 1.772_f32 * u));
        }
    }
    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_yuyv_is_gray() -> Result<()> {
        let yuyv = vec![128u8, 128, 128, 128, 128, 128, 128, 128];
        let image = normalize_to_rgb(&yuyv, 2, 2, PixelFormat::Yuyv)?;
        assert_eq!(image.as_raw(), &vec![128u8; 12]);
        Ok(())
    }

    #[test]
    fn rgb_pass_through_validates_length() {
        let pixels = vec![1u8; 9];
        assert!(normalize_to_rgb(&pixels, 1, 3, PixelFormat::Rgb24).is_ok());
        assert!(normalize_to_rgb(&pixels, 2, 3, PixelFormat::Rgb24).is_err());
    }

    #[test]
    fn unknown_fourcc_is_unsupported() {
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), None);
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::Yuyv));
    }
}
