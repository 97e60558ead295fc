//! Role-space oscillation detection
//!
//! Cells are classified into discrete roles (local max, local min, slope).
//! When cells periodically switch between roles the system has locked into
//! a cycle instead of settling. Detection runs in role space rather than
//! value space so small numerical noise on top of a clean cycle still
//! registers.

use serde::{Deserialize, Serialize};

use crate::frame::{Frame, CELLS, GRID};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Trailing window length, in frames, examined per detection pass.
pub const OSC_WINDOW: usize = 20;

/// Smallest candidate cycle period.
pub const OSC_MIN_PERIOD: usize = 2;

/// Largest candidate cycle period.
pub const OSC_MAX_PERIOD: usize = 10;

/// Fraction of cells that must participate in a cycle before the run is
/// declared oscillating. Filters out isolated flickering cells.
pub const OSC_CELL_FRACTION: f32 = 0.01;

// ============================================================================
// ROLES
// ============================================================================

/// Per-cell role matrix: +1 local max, -1 local min, 0 slope.
#[derive(Clone, PartialEq, Eq)]
pub struct RoleGrid {
    data: Box<[i8; CELLS]>,
}

impl RoleGrid {
    fn zeroed() -> Self {
        Self {
            data: Box::new([0i8; CELLS]),
        }
    }

    /// Role at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i8 {
        self.data[row * GRID + col]
    }

    /// Flat row-major view.
    #[inline]
    pub fn as_slice(&self) -> &[i8] {
        &self.data[..]
    }
}

impl std::fmt::Debug for RoleGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let maxes = self.data.iter().filter(|r| **r == 1).count();
        let mins = self.data.iter().filter(|r| **r == -1).count();
        f.debug_struct("RoleGrid")
            .field("maxes", &maxes)
            .field("mins", &mins)
            .field("slopes", &(CELLS - maxes - mins))
            .finish()
    }
}

/// Classify every cell of a frame by comparing it against its four toroidal
/// neighbors. Comparisons are inclusive and max wins ties, matching the
/// update kernel, so a flat region reads as all-max.
pub fn roles(frame: &Frame) -> RoleGrid {
    let mut out = RoleGrid::zeroed();
    for r in 0..GRID {
        let up = if r == 0 { GRID - 1 } else { r - 1 };
        let down = if r == GRID - 1 { 0 } else { r + 1 };
        for c in 0..GRID {
            let left = if c == 0 { GRID - 1 } else { c - 1 };
            let right = if c == GRID - 1 { 0 } else { c + 1 };

            let v = frame.get(r, c);
            let n0 = frame.get(up, c);
            let n1 = frame.get(down, c);
            let n2 = frame.get(r, left);
            let n3 = frame.get(r, right);

            let max_n = n0.max(n1).max(n2).max(n3);
            let min_n = n0.min(n1).min(n2).min(n3);

            out.data[r * GRID + c] = if v >= max_n {
                1
            } else if v <= min_n {
                -1
            } else {
                0
            };
        }
    }
    out
}

// ============================================================================
// DETECTION
// ============================================================================

/// Report for a detected role-space cycle.
#[derive(Debug, Clone)]
pub struct OscillationReport {
    /// Smallest period whose cycle satisfies the cell-fraction threshold.
    pub period: usize,
    /// Cells that both repeat with this period and actually change role.
    pub oscillating_cells: usize,
    /// The `period` role matrices defining one cycle, oldest first.
    pub cycle_roles: Vec<RoleGrid>,
}

/// Scan a trailing window of frames for periodic role-space cycles.
///
/// For each candidate period p, a cell qualifies when its role repeats with
/// period p across the whole window AND it changes role at least once
/// (constant regions trivially satisfy every period and must not count).
/// Returns the smallest period where at least [`OSC_CELL_FRACTION`] of the
/// grid qualifies.
pub fn detect_oscillation(window: &[&Frame]) -> Option<OscillationReport> {
    if window.len() < OSC_WINDOW {
        return None;
    }
    let recent = &window[window.len() - OSC_WINDOW..];
    let role_mats: Vec<RoleGrid> = recent.iter().map(|f| roles(f)).collect();

    // Cells whose role changes at all within the window.
    let mut changes = [false; CELLS];
    let first = &role_mats[0];
    for mat in &role_mats[1..] {
        for i in 0..CELLS {
            if mat.data[i] != first.data[i] {
                changes[i] = true;
            }
        }
    }
    if !changes.iter().any(|c| *c) {
        return None;
    }

    let min_cells = (CELLS as f32 * OSC_CELL_FRACTION).ceil() as usize;

    for p in OSC_MIN_PERIOD..=OSC_MAX_PERIOD {
        if p >= OSC_WINDOW {
            break;
        }

        let mut matches = [true; CELLS];
        for t in 0..(OSC_WINDOW - p) {
            let a = &role_mats[t];
            let b = &role_mats[t + p];
            for i in 0..CELLS {
                if a.data[i] != b.data[i] {
                    matches[i] = false;
                }
            }
        }

        let oscillating = matches
            .iter()
            .zip(changes.iter())
            .filter(|(m, ch)| **m && **ch)
            .count();

        if oscillating >= min_cells {
            return Some(OscillationReport {
                period: p,
                oscillating_cells: oscillating,
                cycle_roles: role_mats[..p].to_vec(),
            });
        }
    }

    None
}

// Serde for RoleGrid mirrors Frame: a flat row-major list.
impl Serialize for RoleGrid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.data.iter())
    }
}

impl<'de> Deserialize<'de> for RoleGrid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values: Vec<i8> = Vec::deserialize(deserializer)?;
        if values.len() != CELLS {
            return Err(serde::de::Error::invalid_length(
                values.len(),
                &"a flat row-major array of 4096 roles",
            ));
        }
        let mut grid = RoleGrid::zeroed();
        grid.data.copy_from_slice(&values);
        Ok(grid)
    }
}

// ============================================================================
// TESTS
// ============================================================================
