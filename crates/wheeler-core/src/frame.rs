//! Frame - the fundamental spatial unit of memory
//!
//! A frame is a 64x64 single-precision grid with values in [-1, 1]. Seeds,
//! evolution history ticks, and settled attractors are all frames; the
//! distinction is purely about where a frame sits in the evolution lifecycle.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

// ============================================================================
// DIMENSIONS
// ============================================================================

/// Grid side length. Frozen at this on-disk format version.
pub const GRID: usize = 64;

/// Cells per frame (GRID * GRID).
pub const CELLS: usize = GRID * GRID;

// ============================================================================
// FRAME
// ============================================================================

/// A 64x64 single-precision grid, row-major, values in [-1, 1].
///
/// Heap-allocated so frames can be cloned into evolution history without
/// blowing the stack. Cell access wraps through [`Frame::get`]/[`Frame::set`]
/// with explicit row/column indices; toroidal neighbor arithmetic lives in
/// the dynamics kernel, not here.
#[derive(Clone, PartialEq)]
pub struct Frame {
    data: Box<[f32; CELLS]>,
}

impl Frame {
    /// All-zero frame.
    pub fn zeroed() -> Self {
        Self {
            data: Box::new([0.0f32; CELLS]),
        }
    }

    /// Frame with every cell set to `value`.
    pub fn filled(value: f32) -> Self {
        let mut frame = Self::zeroed();
        frame.data.fill(value);
        frame
    }

    /// Build a frame from a generator called with (row, col).
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut frame = Self::zeroed();
        for r in 0..GRID {
            for c in 0..GRID {
                frame.data[r * GRID + c] = f(r, c);
            }
        }
        frame
    }

    /// Build a frame from a row-major slice of exactly [`CELLS`] values.
    ///
    /// Returns `None` on length mismatch.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        if values.len() != CELLS {
            return None;
        }
        let mut frame = Self::zeroed();
        frame.data.copy_from_slice(values);
        Some(frame)
    }

    /// Cell value at (row, col). Callers pass in-range indices.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * GRID + col]
    }

    /// Set cell value at (row, col).
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * GRID + col] = value;
    }

    /// Row-major view of all cells.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data[..]
    }

    /// Mutable row-major view of all cells.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data[..]
    }

    /// Mean absolute per-cell difference against another frame.
    ///
    /// This is the convergence metric: evolution stops when the mean delta
    /// between successive ticks drops below the stability threshold.
    pub fn mean_abs_delta(&self, other: &Frame) -> f32 {
        let sum: f64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs() as f64)
            .sum();
        (sum / CELLS as f64) as f32
    }

    /// Maximum absolute per-cell difference against another frame.
    pub fn max_abs_delta(&self, other: &Frame) -> f32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max)
    }

    /// Rotate by `k` counterclockwise quarter turns (numpy `rot90` order).
    ///
    /// Rotating a seed changes which cells are neighbors, which is exactly
    /// why the rotation-retry path can escape a bad attractor basin.
    pub fn rot90(&self, k: usize) -> Frame {
        match k % 4 {
            0 => self.clone(),
            1 => Frame::from_fn(|r, c| self.get(c, GRID - 1 - r)),
            2 => Frame::from_fn(|r, c| self.get(GRID - 1 - r, GRID - 1 - c)),
            _ => Frame::from_fn(|r, c| self.get(GRID - 1 - c, r)),
        }
    }

    /// Elementwise blend: `(1 - alpha) * self + alpha * other`.
    pub fn blend(&self, other: &Frame, alpha: f32) -> Frame {
        let mut out = Self::zeroed();
        for i in 0..CELLS {
            out.data[i] = (1.0 - alpha) * self.data[i] + alpha * other.data[i];
        }
        out
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let min = self.data.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean: f64 = self.data.iter().map(|v| *v as f64).sum::<f64>() / CELLS as f64;
        f.debug_struct("Frame")
            .field("grid", &GRID)
            .field("min", &min)
            .field("max", &max)
            .field("mean", &mean)
            .finish()
    }
}

// Serialized as a flat row-major array so frames embedded in result types
// stay a plain JSON list of 4096 numbers.
impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(CELLS))?;
        for v in self.data.iter() {
            seq.serialize_element(v)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FrameVisitor;

        impl<'de> Visitor<'de> for FrameVisitor {
            type Value = Frame;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a flat row-major array of {CELLS} floats")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Frame, A::Error> {
                let mut frame = Frame::zeroed();
                for i in 0..CELLS {
                    frame.data[i] = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                if seq.next_element::<f32>()?.is_some() {
                    return Err(de::Error::invalid_length(CELLS + 1, &self));
                }
                Ok(frame)
            }
        }

        deserializer.deserialize_seq(FrameVisitor)
    }
}

// ============================================================================
// CORRELATION
// ============================================================================

/// Pearson correlation of two frames over their flattened cells.
///
/// Mean-centered, unit-norm dot product accumulated in f64. Defined as 0
/// when either side has zero variance, so constant frames never poison a
/// recall ranking with NaN.
pub fn pearson(a: &Frame, b: &Frame) -> f64 {
    let mean_a: f64 = a.as_slice().iter().map(|v| *v as f64).sum::<f64>() / CELLS as f64;
    let mean_b: f64 = b.as_slice().iter().map(|v| *v as f64).sum::<f64>() / CELLS as f64;

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.as_slice().iter().zip(b.as_slice().iter()) {
        let da = *x as f64 - mean_a;
        let db = *y as f64 - mean_b;
        dot += da * db;
        norm_a += da * da;
        norm_b += db * db;
    }

    let norm = (norm_a * norm_b).sqrt();
    if norm > 0.0 { dot / norm } else { 0.0 }
}

// ============================================================================
// TESTS
// ============================================================================
