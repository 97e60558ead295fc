//! Evolution backends - capability interface for bulk evolution
//!
//! The history-retaining [`evolve`](super::evolve) path is the source of
//! truth. Backends provide the history-free surface used for queries and
//! bulk work, so an accelerated implementation can slot in without touching
//! engine semantics. Any backend must keep exact numerical parity with the
//! CPU kernel; the equivalence suite in the workspace e2e tests pins this.

use crate::frame::Frame;

use super::{evolve_quick, Evolution};

/// Capability interface over the evolution kernel.
///
/// Implementations return [`Evolution`] values with empty history; verdicts,
/// tick counts, and final frames must match the CPU engine exactly.
pub trait CaBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;

    /// Evolve one seed without retaining history.
    fn evolve_single(&self, seed: &Frame, max_iters: u32) -> Evolution;

    /// Evolve a batch of seeds without retaining history.
    fn evolve_batch(&self, seeds: &[Frame], max_iters: u32) -> Vec<Evolution> {
        seeds
            .iter()
            .map(|s| self.evolve_single(s, max_iters))
            .collect()
    }
}

// ============================================================================
// CPU BACKEND
// ============================================================================

/// Reference backend: the plain double-buffered CPU kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CaBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn evolve_single(&self, seed: &Frame, max_iters: u32) -> Evolution {
        evolve_quick(seed, max_iters)
    }
}

// ============================================================================
// PARALLEL BACKEND
// ============================================================================

/// Thread-pool backend: fans a batch out across the rayon pool.
///
/// Frames are independent, so parallelism changes wall time only; every
/// per-frame result is bit-identical to [`CpuBackend`].
#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelBackend;

#[cfg(feature = "parallel")]
impl CaBackend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn evolve_single(&self, seed: &Frame, max_iters: u32) -> Evolution {
        evolve_quick(seed, max_iters)
    }

    fn evolve_batch(&self, seeds: &[Frame], max_iters: u32) -> Vec<Evolution> {
        use rayon::prelude::*;
        seeds
            .par_iter()
            .map(|s| evolve_quick(s, max_iters))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
