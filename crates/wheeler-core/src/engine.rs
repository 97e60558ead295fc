//! Memory engine facade
//!
//! [`MemoryEngine`] owns every sub-component (store, codec, stability
//! tracker, evolution backend) as an explicit value; there are no process
//! globals. Construct one with [`MemoryEngine::open`] for the default root
//! or [`MemoryEngine::new`] with a config, then drive the four public
//! operations: store, recall, list, inspect.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::brick::Brick;
use crate::chunking::route_recall;
use crate::codec::{text_id, FrameCodec, FrameMode, TextEmbedder};
use crate::dynamics::{
    evolve_with_rotation_retry, CaBackend, ConvergenceState, CpuBackend, DEFAULT_MAX_ITERS,
};
use crate::error::{MemoryError, Result};
use crate::reconstruction::{reconstruct, Reconstruction, DEFAULT_ALPHA};
use crate::stability::{ScoredPattern, StabilityTracker};
use crate::storage::{truncate_text, AttractorStore, EntrySummary};
use crate::temperature::Tier;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Store root. `None` resolves `WHEELER_MEMORY_ROOT`, then
    /// `$HOME/.wheeler_memory`.
    pub root: Option<PathBuf>,
    /// Tick budget per evolution run.
    pub max_iters: u32,
    /// Codec mode used by the store path.
    pub frame_mode: FrameMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_iters: DEFAULT_MAX_ITERS,
            frame_mode: FrameMode::Hash,
        }
    }
}

// ============================================================================
// API TYPES
// ============================================================================

/// Result of a successful store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResult {
    /// Content-derived memory id.
    pub id: String,
    /// Always converged; failures surface as
    /// [`MemoryError::NotConverged`] instead.
    pub state: ConvergenceState,
    /// Ticks the winning evolution ran.
    pub ticks: u32,
    /// Seed rotation that converged, in degrees.
    pub rotation_used: u32,
    /// Rotation attempts used.
    pub attempts: u32,
    /// Evolution wall time of the winning attempt, in seconds.
    pub wall_time_seconds: f64,
    /// Chunk the memory landed in.
    pub chunk: String,
}

/// Recall tuning knobs.
///
/// `deny_unknown_fields` keeps serialized option bags honest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecallOptions {
    /// Maximum results to return.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Search only this chunk instead of router + on-disk resolution.
    #[serde(default)]
    pub chunk: Option<String>,
    /// Weight of temperature in the effective score. Temperature is never
    /// negative, so any boost is a non-negative shift; 0 disables it.
    #[serde(default)]
    pub temperature_boost: f64,
    /// Encode the query through the embedding codec instead of hashing.
    #[serde(default)]
    pub use_embedding: bool,
    /// Re-evolve a blend of each result with the query context.
    #[serde(default)]
    pub reconstruct: bool,
    /// Blend weight for reconstruction (query share).
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Drop results whose effective similarity falls below this floor.
    #[serde(default)]
    pub min_similarity: Option<f64>,
}

fn default_top_k() -> usize {
    5
}

fn default_alpha() -> f32 {
    DEFAULT_ALPHA
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            chunk: None,
            temperature_boost: 0.0,
            use_embedding: false,
            reconstruct: false,
            alpha: default_alpha(),
            min_similarity: None,
        }
    }
}

/// One recalled memory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallResult {
    /// Memory id.
    pub id: String,
    /// Stored text (truncated at store time).
    pub text: String,
    /// Chunk the memory lives in.
    pub chunk: String,
    /// Raw Pearson correlation against the query attractor.
    pub similarity: f64,
    /// Access temperature at ranking time.
    pub temperature: f64,
    /// Tier of `temperature`.
    pub tier: Tier,
    /// Ranking key: `similarity + boost * temperature`.
    pub effective_similarity: f64,
    /// Stability score of the pattern, including this recall's hit.
    pub stability: f64,
    /// Stored verdict (always converged).
    pub state: ConvergenceState,
    /// Ticks the stored evolution ran.
    pub convergence_ticks: u32,
    /// Creation timestamp of the memory.
    pub timestamp: DateTime<Utc>,
    /// Context reconstruction, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconstruction: Option<Reconstruction>,
}

// ============================================================================
// ENGINE
// ============================================================================

/// The associative memory engine.
pub struct MemoryEngine {
    store: AttractorStore,
    codec: FrameCodec,
    stability: Mutex<StabilityTracker>,
    backend: Box<dyn CaBackend>,
    max_iters: u32,
    frame_mode: FrameMode,
}

impl MemoryEngine {
    /// Build an engine from a config, with the CPU backend and no embedder.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let store = AttractorStore::open(config.root)?;
        let stability = StabilityTracker::load(store.stability_path());
        Ok(Self {
            store,
            codec: FrameCodec::new(),
            stability: Mutex::new(stability),
            backend: Box::new(CpuBackend),
            max_iters: config.max_iters,
            frame_mode: config.frame_mode,
        })
    }

    /// Engine at the default root. The explicit "default engine" accessor;
    /// there is no hidden global instance.
    pub fn open() -> Result<Self> {
        Self::new(EngineConfig::default())
    }

    /// Wire in an embedding model, enabling embedding-mode frames.
    pub fn with_embedder(mut self, embedder: Box<dyn TextEmbedder>) -> Self {
        self.codec = FrameCodec::with_embedder(embedder);
        self
    }

    /// Swap the evolution backend.
    pub fn with_backend(mut self, backend: Box<dyn CaBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// The resolved store root.
    pub fn root(&self) -> &Path {
        self.store.root()
    }

    // ------------------------------------------------------------------
    // Store
    // ------------------------------------------------------------------

    /// Store text as a spatial attractor.
    ///
    /// Routes to a chunk (unless one is given), evolves with rotation
    /// retry, and persists the attractor, brick, and index entry. A
    /// non-converged outcome surfaces as [`MemoryError::NotConverged`] and
    /// persists nothing; re-storing identical text is a content no-op.
    pub fn store(&self, text: &str, chunk: Option<&str>) -> Result<StoreResult> {
        if text.trim().is_empty() {
            return Err(MemoryError::EmptyInput);
        }

        let encoded = self.codec.encode(text, self.frame_mode)?;
        let outcome = evolve_with_rotation_retry(&encoded.frame, self.max_iters);

        if !outcome.converged() {
            return Err(MemoryError::NotConverged {
                state: outcome.evolution.state,
                ticks: outcome.evolution.ticks,
                diagnostics: outcome.evolution.diagnostics(),
            });
        }

        let mut extra = serde_json::Map::new();
        extra.insert("input_text".to_string(), truncate_text(text).into());
        extra.insert("rotation_used".to_string(), outcome.rotation_used.into());
        extra.insert("attempts".to_string(), outcome.attempts.into());
        extra.insert(
            "wall_time_seconds".to_string(),
            outcome.wall_time_seconds.into(),
        );
        extra.insert("frame_mode".to_string(), encoded.mode.as_str().into());
        let brick = Brick::from_evolution(&outcome.evolution, extra);

        let receipt = self.store.store(
            &encoded.id,
            text,
            chunk,
            &outcome,
            &brick,
            encoded.mode,
            Utc::now(),
        )?;

        // Stats bookkeeping must not undo a persisted memory.
        if let Err(e) = self.store.record_rotation_success(outcome.rotation_used) {
            warn!(error = %e, "failed to update rotation stats");
        }

        Ok(StoreResult {
            id: encoded.id,
            state: ConvergenceState::Converged,
            ticks: outcome.evolution.ticks,
            rotation_used: outcome.rotation_used,
            attempts: outcome.attempts,
            wall_time_seconds: outcome.wall_time_seconds,
            chunk: receipt.chunk,
        })
    }

    // ------------------------------------------------------------------
    // Recall
    // ------------------------------------------------------------------

    /// Recall stored memories by correlation against the query's attractor.
    ///
    /// The query is encoded (hash by default, embedding when requested),
    /// evolved, and scanned against every candidate chunk; its final frame
    /// is used even when the query evolution itself did not converge.
    /// Returned entries get their access counters bumped and a stability
    /// hit recorded.
    pub fn recall(&self, text: &str, options: &RecallOptions) -> Result<Vec<RecallResult>> {
        if text.trim().is_empty() {
            return Err(MemoryError::EmptyInput);
        }

        let mode = if options.use_embedding {
            FrameMode::Embedding
        } else {
            FrameMode::Hash
        };
        let encoded = self.codec.encode(text, mode)?;

        let query_evolution = self.backend.evolve_single(&encoded.frame, self.max_iters);
        let query_attractor = query_evolution.attractor;
        debug!(
            state = %query_evolution.state,
            ticks = query_evolution.ticks,
            "query evolved"
        );

        let chunks = self.resolve_chunks(text, options.chunk.as_deref());
        let now = Utc::now();

        let scored = self.store.recall(
            &query_attractor,
            &chunks,
            options.top_k,
            options.temperature_boost,
            options.min_similarity,
            now,
        )?;

        let mut results = Vec::with_capacity(scored.len());
        for s in scored {
            let stability = self.record_stability_hit(&s.entry.text);

            let reconstruction = if options.reconstruct {
                Some(reconstruct(
                    &s.attractor,
                    &query_attractor,
                    options.alpha,
                    self.max_iters,
                ))
            } else {
                None
            };

            results.push(RecallResult {
                id: s.id,
                text: s.entry.text,
                chunk: s.entry.chunk,
                similarity: s.similarity,
                temperature: s.temperature,
                tier: s.tier,
                effective_similarity: s.effective_similarity,
                stability,
                state: s.entry.state,
                convergence_ticks: s.entry.convergence_ticks,
                timestamp: s.entry.timestamp,
                reconstruction,
            });
        }

        self.flush_stability();
        Ok(results)
    }

    /// Chunk set for a recall: the explicit chunk alone, or the router's
    /// picks unioned with everything on disk so re-routed memories stay
    /// reachable.
    fn resolve_chunks(&self, query: &str, explicit: Option<&str>) -> Vec<String> {
        if let Some(chunk) = explicit {
            return vec![chunk.to_string()];
        }
        let mut chunks = route_recall(query);
        for existing in self.store.existing_chunks() {
            if !chunks.contains(&existing) {
                chunks.push(existing);
            }
        }
        chunks
    }

    // ------------------------------------------------------------------
    // Listing / inspection
    // ------------------------------------------------------------------

    /// Enumerate stored memories with live temperature.
    pub fn list_memories(&self, chunk: Option<&str>) -> Result<Vec<EntrySummary>> {
        self.store.list(chunk, Utc::now())
    }

    /// Load the full evolution brick for a memory, searching all chunks.
    pub fn inspect_brick(&self, id: &str) -> Result<Brick> {
        self.store.find_brick(id)
    }

    /// Per-angle rotation success counts.
    pub fn rotation_stats(&self) -> Result<std::collections::BTreeMap<String, u64>> {
        self.store.rotation_stats()
    }

    // ------------------------------------------------------------------
    // Stability passthroughs
    // ------------------------------------------------------------------

    /// Record a context switch across all tracked patterns.
    pub fn record_context_switch(&self) {
        if let Ok(mut tracker) = self.stability.lock() {
            tracker.record_context_switch();
            tracker.flush();
        }
    }

    /// Mark a pattern (by id, the hash of its text) as having survived
    /// consolidation compression.
    pub fn record_compression_survival(&self, pattern_id: &str) {
        if let Ok(mut tracker) = self.stability.lock() {
            tracker.record_compression_survival(pattern_id);
            tracker.flush();
        }
    }

    /// Every tracked pattern with its stability score, highest first.
    pub fn stability_report(&self) -> Vec<ScoredPattern> {
        match self.stability.lock() {
            Ok(tracker) => tracker.all_scored(),
            Err(_) => Vec::new(),
        }
    }

    fn record_stability_hit(&self, text: &str) -> f64 {
        match self.stability.lock() {
            Ok(mut tracker) => tracker.record_hit(&text_id(text), text),
            Err(_) => {
                warn!("stability tracker lock poisoned; skipping hit");
                0.0
            }
        }
    }

    fn flush_stability(&self) {
        if let Ok(mut tracker) = self.stability.lock() {
            tracker.flush();
        }
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("root", &self.store.root())
            .field("backend", &self.backend.name())
            .field("max_iters", &self.max_iters)
            .field("frame_mode", &self.frame_mode)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
