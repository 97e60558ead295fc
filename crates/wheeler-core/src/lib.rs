//! # Wheeler Core
//!
//! Associative memory engine that stores text as stable spatial attractors
//! of a 2D cellular-automata dynamical system and recalls them by Pearson
//! correlation against freshly computed query attractors.
//!
//! - **Frame codec**: deterministic text to 64x64 seed frames, by SHA-256
//!   hash (default) or sentence embedding through a fixed Gaussian
//!   projection
//! - **CA engine**: 3-state toroidal dynamics with convergence, role-space
//!   oscillation, and chaos verdicts
//! - **Rotation retry**: quarter-turn seed rotations to escape bad
//!   attractor basins, with per-angle success stats
//! - **Bricks**: full tick-by-tick evolution history persisted per memory
//! - **Chunked store**: keyword-routed on-disk partitions with
//!   per-entry access temperature (hot/warm/cold)
//! - **Stability metrics**: hit count, cross-context persistence, and
//!   compression survival composited into a [0, 1] score
//! - **Reconstruction**: blend a stored attractor with the query context
//!   and re-evolve, so the same memory recalls differently in different
//!   contexts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wheeler_core::{MemoryEngine, RecallOptions};
//!
//! # fn main() -> wheeler_core::Result<()> {
//! // Engine at $WHEELER_MEMORY_ROOT or ~/.wheeler_memory
//! let engine = MemoryEngine::open()?;
//!
//! // Store a memory as a spatial attractor
//! let stored = engine.store("The capital of France is Paris.", None)?;
//! println!("stored {} in chunk {}", stored.id, stored.chunk);
//!
//! // Recall by correlation
//! let results = engine.recall(
//!     "The capital of France is Paris.",
//!     &RecallOptions { top_k: 1, ..Default::default() },
//! )?;
//! println!("similarity {:.4}", results[0].similarity);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `embeddings`: fastembed-backed [`FastEmbedder`] for embedding-mode
//!   frames
//! - `parallel`: rayon-backed [`ParallelBackend`] for batch evolution
//! - `full`: everything above

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod brick;
pub mod chunking;
pub mod codec;
pub mod dynamics;
pub mod engine;
pub mod error;
pub mod frame;
pub mod reconstruction;
pub mod stability;
pub mod storage;
pub mod temperature;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Engine facade
pub use engine::{EngineConfig, MemoryEngine, RecallOptions, RecallResult, StoreResult};

// Errors
pub use error::{MemoryError, Result};

// Frames and correlation
pub use frame::{pearson, Frame, CELLS, GRID};

// Codec
pub use codec::{hash_frame, text_id, EmbeddingError, FrameCodec, FrameMode, TextEmbedder};

#[cfg(feature = "embeddings")]
#[cfg_attr(docsrs, doc(cfg(feature = "embeddings")))]
pub use codec::FastEmbedder;

// Dynamics
pub use dynamics::{
    detect_oscillation, evolve, evolve_with_rotation_retry, roles, step, CaBackend,
    ConvergenceState, CpuBackend, Evolution, OscillationReport, RoleGrid, RotationOutcome,
    CONVERGENCE_THRESHOLD, DEFAULT_MAX_ITERS,
};

#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
pub use dynamics::ParallelBackend;

// Bricks
pub use brick::Brick;

// Storage
pub use storage::{AttractorStore, EntrySummary, IndexEntry, ROOT_ENV_VAR};

// Temperature
pub use temperature::{compute_temperature, tier_for, Tier};

// Stability
pub use stability::{PatternMetrics, ScoredPattern, StabilityTracker};

// Reconstruction
pub use reconstruction::{reconstruct, reconstruct_batch, Reconstruction, DEFAULT_ALPHA};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        ConvergenceState, EngineConfig, Frame, FrameMode, MemoryEngine, MemoryError,
        RecallOptions, RecallResult, Result, StoreResult, Tier,
    };

    #[cfg(feature = "embeddings")]
    pub use crate::FastEmbedder;

    #[cfg(feature = "parallel")]
    pub use crate::ParallelBackend;
}
