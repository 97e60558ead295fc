//! Cellular-automata engine - the dynamical core of the memory
//!
//! Implements the 3-state CA dynamics: local max cells push toward +1,
//! local min cells push toward -1, slope cells flow toward their max
//! neighbor. Evolution runs a seed frame until it settles into an attractor,
//! locks into a role-space cycle, or exhausts its tick budget.
//!
//! The kernel is an explicit double-buffered loop over the 64x64 torus.
//! Both buffers are allocated once per evolution; a tick writes the new
//! frame into the spare buffer and swaps.

mod backend;
mod oscillation;
mod rotation;

pub use backend::CpuBackend;
#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
pub use backend::ParallelBackend;
pub use backend::CaBackend;
pub use oscillation::{
    detect_oscillation, roles, OscillationReport, RoleGrid, OSC_CELL_FRACTION, OSC_MAX_PERIOD,
    OSC_MIN_PERIOD, OSC_WINDOW,
};
pub use rotation::{evolve_with_rotation_retry, RotationOutcome, ROTATION_ANGLES};

use serde::{Deserialize, Serialize};

use crate::frame::{Frame, GRID};

// ============================================================================
// FROZEN CONSTANTS
// ============================================================================
// These cross the on-disk interface; changing any of them is a format
// version bump.

/// Update rate for local-max cells pushing toward +1.
pub const LOCAL_MAX_RATE: f32 = 0.35;

/// Update rate for local-min cells pushing toward -1.
pub const LOCAL_MIN_RATE: f32 = 0.35;

/// Update rate for slope cells flowing toward their max neighbor.
pub const SLOPE_RATE: f32 = 0.20;

/// Convergence threshold on mean absolute per-cell delta between ticks.
pub const CONVERGENCE_THRESHOLD: f32 = 1e-4;

/// Default tick budget for a single evolution run.
pub const DEFAULT_MAX_ITERS: u32 = 1000;

/// First tick after which oscillation detection starts.
pub const OSC_CHECK_START: u32 = 50;

/// Oscillation detection cadence in ticks.
pub const OSC_CHECK_EVERY: u32 = 10;

// ============================================================================
// VERDICTS
// ============================================================================

/// Outcome of a single evolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConvergenceState {
    /// Settled into a stable attractor.
    Converged,
    /// Locked into a periodic role-space cycle.
    Oscillating,
    /// Exhausted the tick budget without settling.
    Chaotic,
    /// Every rotation attempt failed; set by the rotation controller only.
    FailedAllRotations,
}

impl ConvergenceState {
    /// Wire-format name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvergenceState::Converged => "CONVERGED",
            ConvergenceState::Oscillating => "OSCILLATING",
            ConvergenceState::Chaotic => "CHAOTIC",
            ConvergenceState::FailedAllRotations => "FAILED_ALL_ROTATIONS",
        }
    }
}

impl std::fmt::Display for ConvergenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostics attached to non-converged verdicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionDiagnostics {
    /// Detected cycle period, when the verdict is oscillating.
    pub cycle_period: Option<usize>,
    /// Number of cells participating in the detected cycle.
    pub oscillating_cells: usize,
}

/// Full result of evolving one seed frame.
#[derive(Debug, Clone)]
pub struct Evolution {
    /// Verdict for this run.
    pub state: ConvergenceState,
    /// Final frame. The canonical attractor when converged, best-effort
    /// otherwise.
    pub attractor: Frame,
    /// Ticks actually executed.
    pub ticks: u32,
    /// Every frame from seed to final, inclusive. Empty when history
    /// retention was disabled (backend paths).
    pub history: Vec<Frame>,
    /// Oscillation report, when the verdict is oscillating.
    pub oscillation: Option<OscillationReport>,
}

impl Evolution {
    /// Diagnostics bag for error reporting.
    pub fn diagnostics(&self) -> EvolutionDiagnostics {
        EvolutionDiagnostics {
            cycle_period: self.oscillation.as_ref().map(|o| o.period),
            oscillating_cells: self
                .oscillation
                .as_ref()
                .map(|o| o.oscillating_cells)
                .unwrap_or(0),
        }
    }
}

// ============================================================================
// KERNEL
// ============================================================================

/// One CA tick: read `src`, write the updated frame into `dst`.
///
/// Von Neumann neighborhood with toroidal wrap. Comparisons are inclusive,
/// max checked first, so a perfectly flat region counts as all-max and
/// drifts toward +1 together.
pub fn step_into(src: &Frame, dst: &mut Frame) {
    for r in 0..GRID {
        let up = if r == 0 { GRID - 1 } else { r - 1 };
        let down = if r == GRID - 1 { 0 } else { r + 1 };
        for c in 0..GRID {
            let left = if c == 0 { GRID - 1 } else { c - 1 };
            let right = if c == GRID - 1 { 0 } else { c + 1 };

            let v = src.get(r, c);
            let n0 = src.get(up, c);
            let n1 = src.get(down, c);
            let n2 = src.get(r, left);
            let n3 = src.get(r, right);

            let max_n = n0.max(n1).max(n2).max(n3);
            let min_n = n0.min(n1).min(n2).min(n3);

            let delta = if v >= max_n {
                (1.0 - v) * LOCAL_MAX_RATE
            } else if v <= min_n {
                (-1.0 - v) * LOCAL_MIN_RATE
            } else {
                (max_n - v) * SLOPE_RATE
            };

            dst.set(r, c, (v + delta).clamp(-1.0, 1.0));
        }
    }
}

/// One CA tick as a pure function. Convenience for tests and properties.
pub fn step(frame: &Frame) -> Frame {
    let mut out = Frame::zeroed();
    step_into(frame, &mut out);
    out
}

// ============================================================================
// EVOLUTION
// ============================================================================

/// Evolve a seed until convergence, oscillation, or tick exhaustion,
/// retaining the full tick history for brick construction.
pub fn evolve(seed: &Frame, max_iters: u32) -> Evolution {
    evolve_inner(seed, max_iters, true)
}

/// Evolve without retaining history. Same verdict semantics as [`evolve`];
/// used by backends where only the final frame matters.
pub fn evolve_quick(seed: &Frame, max_iters: u32) -> Evolution {
    evolve_inner(seed, max_iters, false)
}

fn evolve_inner(seed: &Frame, max_iters: u32, keep_history: bool) -> Evolution {
    let mut cur = seed.clone();
    let mut next = Frame::zeroed();

    let mut history: Vec<Frame> = Vec::new();
    if keep_history {
        history.reserve(64);
        history.push(cur.clone());
    }

    // Trailing window for the oscillation classifier. Frames are recycled
    // once the window is full, so the steady-state loop does not allocate.
    let mut window: std::collections::VecDeque<Frame> =
        std::collections::VecDeque::with_capacity(OSC_WINDOW);
    window.push_back(cur.clone());

    for i in 0..max_iters {
        step_into(&cur, &mut next);
        let delta = next.mean_abs_delta(&cur);
        std::mem::swap(&mut cur, &mut next);

        if keep_history {
            history.push(cur.clone());
        }
        push_window(&mut window, &cur);

        if delta < CONVERGENCE_THRESHOLD {
            return Evolution {
                state: ConvergenceState::Converged,
                attractor: cur,
                ticks: i + 1,
                history,
                oscillation: None,
            };
        }

        if i > OSC_CHECK_START && i % OSC_CHECK_EVERY == 0 && window.len() >= OSC_WINDOW {
            let frames: Vec<&Frame> = window.iter().collect();
            if let Some(report) = detect_oscillation(&frames) {
                return Evolution {
                    state: ConvergenceState::Oscillating,
                    attractor: cur,
                    ticks: i + 1,
                    history,
                    oscillation: Some(report),
                };
            }
        }
    }

    Evolution {
        state: ConvergenceState::Chaotic,
        attractor: cur,
        ticks: max_iters,
        history,
        oscillation: None,
    }
}

fn push_window(window: &mut std::collections::VecDeque<Frame>, cur: &Frame) {
    if window.len() == OSC_WINDOW {
        if let Some(mut recycled) = window.pop_front() {
            recycled.as_mut_slice().copy_from_slice(cur.as_slice());
            window.push_back(recycled);
            return;
        }
    }
    window.push_back(cur.clone());
}

// ============================================================================
// TESTS
// ============================================================================
