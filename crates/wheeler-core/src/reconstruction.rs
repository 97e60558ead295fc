//! Reconstructive recall - context-dependent memory
//!
//! A recalled memory is not replayed verbatim: the stored attractor is
//! blended with the current query's attractor and re-evolved, so the same
//! memory settles differently depending on what the caller is thinking
//! about. Pure computation; nothing here touches storage.

use serde::{Deserialize, Serialize};

use crate::dynamics::{evolve, ConvergenceState};
use crate::frame::{pearson, Frame};

/// Default blend weight: memory-dominant but context-aware.
pub const DEFAULT_ALPHA: f32 = 0.3;

/// Result of reconstructing one stored attractor in a query context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconstruction {
    /// The re-evolved attractor.
    pub attractor: Frame,
    /// Verdict of the re-evolution.
    pub state: ConvergenceState,
    /// Ticks the re-evolution ran.
    pub convergence_ticks: u32,
    /// Blend weight used.
    pub alpha: f32,
    /// Pearson correlation of the reconstruction against the stored
    /// attractor.
    pub correlation_with_stored: f64,
    /// Pearson correlation of the reconstruction against the query
    /// attractor.
    pub correlation_with_query: f64,
}

/// Blend a stored attractor with a query attractor and re-evolve.
///
/// `alpha` is the query weight: 0 replays pure memory, 1 evolves pure
/// query. The result reports how far the reconstruction drifted toward
/// each parent.
pub fn reconstruct(stored: &Frame, query: &Frame, alpha: f32, max_iters: u32) -> Reconstruction {
    let blended = stored.blend(query, alpha);
    let result = evolve(&blended, max_iters);

    let correlation_with_stored = pearson(&result.attractor, stored);
    let correlation_with_query = pearson(&result.attractor, query);

    Reconstruction {
        attractor: result.attractor,
        state: result.state,
        convergence_ticks: result.ticks,
        alpha,
        correlation_with_stored,
        correlation_with_query,
    }
}

/// Reconstruct several stored attractors against one query context.
pub fn reconstruct_batch(
    stored: &[Frame],
    query: &Frame,
    alpha: f32,
    max_iters: u32,
) -> Vec<Reconstruction> {
    stored
        .iter()
        .map(|s| reconstruct(s, query, alpha, max_iters))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
