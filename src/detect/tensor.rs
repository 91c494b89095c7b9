use crate::error::{PerceptionError, Result};

/// Offset of the first class score within a row.
pub const CLASS_SCORE_OFFSET: usize = 5;
/// Offset of the objectness score within a row.
pub const OBJECTNESS_INDEX: usize = 4;

/// Raw output of a YOLOv5-style detector for one frame.
///
/// Logically `rows x dims`, where each row is
/// `[cx, cy, w, h, objectness, class_0 .. class_{C-1}]` in network input
/// coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetectionTensor {
    data: Vec<f32>,
    rows: usize,
    dims: usize,
}

impl RawDetectionTensor {
    pub fn new(data: Vec<f32>, rows: usize, dims: usize) -> Result<Self> {
        if dims <= CLASS_SCORE_OFFSET {
            return Err(PerceptionError::config(format!(
                "row dimension {} leaves no room for class scores",
                dims
            )));
        }
        let expected = rows
            .checked_mul(dims)
            .ok_or_else(|| PerceptionError::config("tensor dimensions overflow"))?;
        if data.len() != expected {
            return Err(PerceptionError::config(format!(
                "tensor holds {} values, expected {} ({} rows x {} dims)",
                data.len(),
                expected,
                rows,
                dims
            )));
        }
        Ok(Self { data, rows, dims })
    }

    /// Build from an inference output shape, either `[1, rows, dims]` or
    /// `[rows, dims]`.
    pub fn from_shape(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        match shape {
            [1, rows, dims] | [rows, dims] => Self::new(data, *rows, *dims),
            other => Err(PerceptionError::config(format!(
                "unsupported detector output shape {:?}",
                other
            ))),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn num_classes(&self) -> usize {
        self.dims - CLASS_SCORE_OFFSET
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.dims;
        self.data.get(start..start + self.dims)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dims)
    }
}
