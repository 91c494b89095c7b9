/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box in source-frame pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Exclusive right edge. Widened so saturated boxes cannot overflow.
    pub fn right(&self) -> i64 {
        i64::from(self.left) + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.top) + i64::from(self.height)
    }

    /// Area in square pixels; degenerate boxes have zero area.
    pub fn area(&self) -> f64 {
        f64::from(self.width.max(0)) * f64::from(self.height.max(0))
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let l = i64::from(self.left.max(other.left));
        let r = self.right().min(other.right());
        let t = i64::from(self.top.max(other.top));
        let b = self.bottom().min(other.bottom());
        (r - l).max(0) as f64 * (b - t).max(0) as f64
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One decoded candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    /// Objectness of the row the detection came from.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A detection that survived suppression.
///
/// `id` is the 1-based rank in the keep list of the current frame. It is a
/// display label only and carries no identity across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectedDetection {
    pub id: usize,
    pub detection: Detection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(10, 10, 20, 40);
        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn iou_of_disjoint_and_degenerate_boxes_is_zero() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(20, 20, 10, 10);
        assert_eq!(a.iou(&b), 0.0);

        let flat = BoundingBox::new(0, 10, 10, 0);
        assert_eq!(flat.iou(&flat), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(5, 0, 10, 10);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-12);
    }

    #[test]
    fn saturated_boxes_do_not_overflow() {
        let a = BoundingBox::new(i32::MAX, 0, 1_000_000_000, 100);
        let b = BoundingBox::new(i32::MAX, 50, i32::MAX, 100);
        assert_eq!(a.right(), i64::from(i32::MAX) + 1_000_000_000);
        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
        // overlap is 1e9 x 50 out of 1e11 + 2.147e11 - 5e10
        let expected = 5.0e10 / (1.0e11 + f64::from(i32::MAX) * 100.0 - 5.0e10);
        assert!((a.iou(&b) - expected).abs() < 1e-12);

        let far_left = BoundingBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(far_left.bottom(), -1);
        assert_eq!(far_left.iou(&a), 0.0);
    }
}
