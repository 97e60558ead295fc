//! Rotation retry - escaping bad attractor basins
//!
//! When evolution fails to settle, rotating the seed by 90/180/270 degrees
//! changes the neighbor topology and can land the system on a different
//! dynamical trajectory. The controller tries each quarter turn in order
//! and returns the first converged run.

use std::time::Instant;

use tracing::debug;

use crate::frame::Frame;

use super::{evolve, ConvergenceState, Evolution};

/// The rotation angles attempted, in order.
pub const ROTATION_ANGLES: [u32; 4] = [0, 90, 180, 270];

/// Result of a rotation-retry evolution.
#[derive(Debug, Clone)]
pub struct RotationOutcome {
    /// The winning evolution, or the last attempt with its state rewritten
    /// to [`ConvergenceState::FailedAllRotations`] when every angle failed.
    pub evolution: Evolution,
    /// Rotation angle of the returned attempt, in degrees.
    pub rotation_used: u32,
    /// Attempts executed, including the returned one.
    pub attempts: u32,
    /// Evolution wall time of the returned attempt, in seconds.
    pub wall_time_seconds: f64,
}

impl RotationOutcome {
    /// True when the returned attempt converged.
    pub fn converged(&self) -> bool {
        self.evolution.state == ConvergenceState::Converged
    }
}

/// Evolve a seed, retrying on each quarter-turn rotation until one attempt
/// converges. Nothing is persisted here; the caller stores the outcome and
/// updates rotation statistics.
pub fn evolve_with_rotation_retry(seed: &Frame, max_iters: u32) -> RotationOutcome {
    let mut last: Option<RotationOutcome> = None;

    for (i, angle) in ROTATION_ANGLES.iter().enumerate() {
        let frame = seed.rot90(i);

        let start = Instant::now();
        let evolution = evolve(&frame, max_iters);
        let wall_time_seconds = start.elapsed().as_secs_f64();

        let outcome = RotationOutcome {
            rotation_used: *angle,
            attempts: i as u32 + 1,
            wall_time_seconds,
            evolution,
        };

        if outcome.converged() {
            debug!(
                angle,
                ticks = outcome.evolution.ticks,
                attempts = outcome.attempts,
                "evolution converged"
            );
            return outcome;
        }

        debug!(
            angle,
            state = %outcome.evolution.state,
            ticks = outcome.evolution.ticks,
            "rotation attempt failed"
        );
        last = Some(outcome);
    }

    // All four angles failed; hand back the final attempt with the terminal
    // state so callers still see its frame and diagnostics.
    let mut outcome = match last {
        Some(o) => o,
        // Unreachable in practice: ROTATION_ANGLES is non-empty.
        None => RotationOutcome {
            evolution: evolve(seed, max_iters),
            rotation_used: 0,
            attempts: 1,
            wall_time_seconds: 0.0,
        },
    };
    outcome.evolution.state = ConvergenceState::FailedAllRotations;
    outcome
}

// ============================================================================
// TESTS
// ============================================================================
