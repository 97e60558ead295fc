//! Chunk index schema and legacy migration
//!
//! `index.json` is a bare object mapping memory id to entry, the shape
//! earlier releases wrote. Entries that predate access tracking lack
//! `hit_count` / `last_accessed`; those are modeled as an explicit legacy
//! variant and migrated one-way on load, backfilling the access fields from
//! the entry's own creation timestamp.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::FrameMode;
use crate::dynamics::ConvergenceState;
use crate::error::{MemoryError, Result};

/// Characters of input text stored per entry.
pub const MAX_TEXT_LEN: usize = 512;

// ============================================================================
// ENTRY SCHEMA
// ============================================================================

/// Access bookkeeping and store-path metadata for one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessMetadata {
    /// Times this memory appeared in a recall top-k. Non-decreasing.
    pub hit_count: u64,
    /// Last recall that returned this memory; creation time until then.
    pub last_accessed: DateTime<Utc>,
    /// Seed rotation that converged, in degrees.
    pub rotation_used: u32,
    /// Rotation attempts used by the winning store.
    pub attempts: u32,
    /// Evolution wall time of the winning attempt, in seconds.
    pub wall_time_seconds: f64,
    /// Codec mode that produced the seed frame.
    pub frame_mode: FrameMode,
}

/// One stored memory in a chunk index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Original input text, truncated to [`MAX_TEXT_LEN`] characters.
    pub text: String,
    /// Chunk this entry lives in.
    pub chunk: String,
    /// Always converged for stored entries.
    pub state: ConvergenceState,
    /// Ticks the winning evolution ran.
    pub convergence_ticks: u32,
    /// Creation timestamp. Preserved across idempotent re-stores.
    pub timestamp: DateTime<Utc>,
    /// Access and store-path bookkeeping.
    pub metadata: AccessMetadata,
}

/// Pre-access-tracking entry shape. Migrated on load, never written back
/// in this form.
#[derive(Debug, Clone, Deserialize)]
struct LegacyEntry {
    text: String,
    #[serde(default)]
    chunk: Option<String>,
    state: ConvergenceState,
    convergence_ticks: u32,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

/// Raw wire shape: current schema first, legacy fallback.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    V1(IndexEntry),
    V0(LegacyEntry),
}

impl LegacyEntry {
    /// One-way migration. Missing access fields backfill from the entry's
    /// creation timestamp; missing store metadata takes conservative
    /// defaults.
    fn migrate(self, chunk_name: &str) -> IndexEntry {
        let hit_count = self
            .metadata
            .get("hit_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let last_accessed = self
            .metadata
            .get("last_accessed")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(self.timestamp);
        let rotation_used = self
            .metadata
            .get("rotation_used")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        let attempts = self
            .metadata
            .get("attempts")
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as u32;
        let wall_time_seconds = self
            .metadata
            .get("wall_time_seconds")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        IndexEntry {
            text: self.text,
            chunk: self.chunk.unwrap_or_else(|| chunk_name.to_string()),
            state: self.state,
            convergence_ticks: self.convergence_ticks,
            timestamp: self.timestamp,
            metadata: AccessMetadata {
                hit_count,
                last_accessed,
                rotation_used,
                attempts,
                wall_time_seconds,
                frame_mode: FrameMode::Hash,
            },
        }
    }
}

// ============================================================================
// CHUNK INDEX
// ============================================================================

/// In-memory image of one chunk's `index.json`. BTreeMap keeps the on-disk
/// ordering stable across rewrites.
pub type ChunkIndex = BTreeMap<String, IndexEntry>;

/// Parse an index file's contents, dropping (and logging) corrupt entries
/// instead of failing the chunk.
///
/// A file-level parse failure is a [`MemoryError::CorruptIndex`]; the
/// caller decides whether that degrades (recall) or surfaces (store).
pub fn parse_index(contents: &str, chunk_name: &str) -> Result<ChunkIndex> {
    let raw: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(contents).map_err(|e| MemoryError::CorruptIndex {
            chunk: chunk_name.to_string(),
            reason: e.to_string(),
        })?;

    let mut index = ChunkIndex::new();
    for (id, value) in raw {
        match serde_json::from_value::<RawEntry>(value) {
            Ok(RawEntry::V1(entry)) => {
                index.insert(id, entry);
            }
            Ok(RawEntry::V0(legacy)) => {
                index.insert(id, legacy.migrate(chunk_name));
            }
            Err(e) => {
                warn!(chunk = chunk_name, id = %id, error = %e, "dropping corrupt index entry");
            }
        }
    }
    Ok(index)
}

/// Load a chunk index from disk. A missing file is an empty index.
pub fn load_index(path: &Path, chunk_name: &str) -> Result<ChunkIndex> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_index(&contents, chunk_name),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ChunkIndex::new()),
        Err(e) => Err(MemoryError::Io(e)),
    }
}

/// Write a chunk index atomically.
pub fn save_index(path: &Path, index: &ChunkIndex) -> Result<()> {
    super::atomic_write_json(path, index)
}

/// Truncate input text to the per-entry cap on a character boundary.
pub fn truncate_text(text: &str) -> String {
    text.chars().take(MAX_TEXT_LEN).collect()
}

// ============================================================================
// CHUNK METADATA
// ============================================================================

/// Per-chunk statistics, stored in `metadata.json` beside the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// When the chunk directory was first created.
    pub created: DateTime<Utc>,
    /// Last store or recall touching the chunk.
    pub last_accessed: DateTime<Utc>,
    /// Memories stored into the chunk over its lifetime.
    #[serde(default)]
    pub store_count: u64,
}

impl ChunkMeta {
    /// Fresh metadata for a newly created chunk.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created: now,
            last_accessed: now,
            store_count: 0,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
