//! Annotated overlay for processed frames.
//!
//! Boxes and label backgrounds are always drawn. Label text needs a TTF/OTF
//! font; without one the renderer only draws the geometry.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::classes::ClassNames;
use crate::error::{PerceptionError, Result};
use crate::pipeline::{FrameReport, PerceivedObject};

const BOX_COLOR: Rgb<u8> = Rgb([50, 178, 255]);
const BOX_THICKNESS: i64 = 4;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const WARNING_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const WARNING_BACKGROUND: Rgb<u8> = Rgb([255, 0, 0]);
const HEADER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Horizontal gap between the class label and the distance label.
const LABEL_GAP: i64 = 5;
const DISTANCE_LABEL_WIDTH: u32 = 95;
const COORDINATE_LABEL_WIDTH: u32 = 270;
/// Text height used for backgrounds when no font is loaded.
const FALLBACK_TEXT_HEIGHT: u32 = 14;

/// Fonts tried when no font file is configured.
pub const SYSTEM_FONT_CANDIDATES: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
];

pub struct OverlayRenderer {
    font: Option<FontVec>,
    scale: PxScale,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self {
            font: None,
            scale: PxScale::from(16.0),
        }
    }
}

impl OverlayRenderer {
    /// Renderer without text.
    pub fn new() -> Self {
        Self::default()
    }

    /// First loadable font from `candidates`. Falls back to a renderer that
    /// draws boxes and label backgrounds only, and says so once.
    pub fn with_first_font<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for path in candidates {
            match Self::with_font_file(path) {
                Ok(renderer) => {
                    log::info!("overlay font: {}", path.as_ref().display());
                    return renderer;
                }
                Err(err) => log::debug!("skipping overlay font: {}", err),
            }
        }
        log::warn!(
            "no overlay font found; class, D2H and X/Y/Z labels are drawn as blank boxes (use --font)"
        );
        Self::new()
    }

    pub fn with_system_font() -> Self {
        Self::with_first_font(&SYSTEM_FONT_CANDIDATES)
    }

    pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| PerceptionError::io(format!("cannot read font {}", path.display()), e))?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| {
            PerceptionError::decode(format!("invalid font {}: {}", path.display(), e))
        })?;
        log::debug!("loaded overlay font {}", path.display());
        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every selection in `report` plus the inference-time header.
    pub fn draw(&self, image: &mut RgbImage, report: &FrameReport, classes: &ClassNames) {
        for object in &report.objects {
            self.draw_object(image, object, classes);
        }
        if let Some(elapsed) = report.inference_time {
            let header = format!("Inference time: {:.2} ms", elapsed.as_secs_f64() * 1000.0);
            self.text(image, &header, 0, 0, HEADER_COLOR);
        }
    }

    fn draw_object(&self, image: &mut RgbImage, object: &PerceivedObject, classes: &ClassNames) {
        let bbox = object.bbox();
        let (left, top) = (i64::from(bbox.left), i64::from(bbox.top));
        for inset in 0..BOX_THICKNESS {
            let width = i64::from(bbox.width) - 2 * inset;
            let height = i64::from(bbox.height) - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            if let Some(rect) = visible_rect(image, left + inset, top + inset, width, height) {
                draw_hollow_rect_mut(image, rect, BOX_COLOR);
            }
        }

        let label = format!(
            "{}|{:.2}  ID:{}",
            classes.label(object.class_id()),
            object.confidence(),
            object.selection.id
        );
        let (label_width, label_height) = self.measure(&label);
        let right_of_label = left + i64::from(label_width) + LABEL_GAP;

        if let Some(distance) = object.distance_m {
            let (background, color) = if object.too_close {
                (WARNING_BACKGROUND, WARNING_TEXT_COLOR)
            } else {
                (LABEL_BACKGROUND, TEXT_COLOR)
            };
            fill(image, right_of_label, top, DISTANCE_LABEL_WIDTH, label_height, background);
            self.text(image, &format!("D2H = {:.2}", distance), right_of_label, top, color);
        }

        if let Some(position) = object.position {
            let x = right_of_label + i64::from(DISTANCE_LABEL_WIDTH) + LABEL_GAP;
            let coordinates = format!(
                "X = {:.2} Y = {:.2} Z = {:.2}",
                position.x, position.y, position.z
            );
            fill(image, x, top, COORDINATE_LABEL_WIDTH, label_height, LABEL_BACKGROUND);
            self.text(image, &coordinates, x, top, TEXT_COLOR);
        }

        fill(image, left, top, label_width, label_height, LABEL_BACKGROUND);
        self.text(image, &label, left, top, TEXT_COLOR);
    }

    fn measure(&self, text: &str) -> (u32, u32) {
        match &self.font {
            Some(font) => {
                let (w, h) = text_size(self.scale, font, text);
                (w.max(1), h.max(1))
            }
            // rough monospace estimate so backgrounds still line up
            None => (text.len() as u32 * 8, FALLBACK_TEXT_HEIGHT),
        }
    }

    fn text(&self, image: &mut RgbImage, text: &str, x: i64, y: i64, color: Rgb<u8>) {
        let Some(font) = &self.font else {
            return;
        };
        let (w, h) = (i64::from(image.width()), i64::from(image.height()));
        // anchors this far out cannot put a glyph on the image
        if x >= w || y >= h || x < -w || y < -h {
            return;
        }
        draw_text_mut(image, color, x as i32, y as i32, self.scale, font, text);
    }
}

fn fill(image: &mut RgbImage, x: i64, y: i64, width: u32, height: u32, color: Rgb<u8>) {
    if let Some(rect) = visible_rect(image, x, y, i64::from(width), i64::from(height)) {
        draw_filled_rect_mut(image, rect, color);
    }
}

/// Clamp a rectangle to one pixel beyond the image on every side.
///
/// Edges outside the image stay outside, so outlines and fills look the same
/// as unclamped drawing while every coordinate fits in `i32`.
fn visible_rect(image: &RgbImage, left: i64, top: i64, width: i64, height: i64) -> Option<Rect> {
    if width <= 0 || height <= 0 {
        return None;
    }
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    let right = left + width - 1;
    let bottom = top + height - 1;
    if right < 0 || bottom < 0 || left >= w || top >= h {
        return None;
    }
    let (x0, y0) = (left.max(-1), top.max(-1));
    let (x1, y1) = (right.min(w), bottom.min(h));
    Some(Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32))
}
