//! Attractor storage - chunked on-disk persistence
//!
//! Layout per chunk:
//!
//! ```text
//! <root>/chunks/<chunk>/
//!     index.json                 # id -> IndexEntry
//!     attractors/<id>.tensor     # final attractor, self-describing f32 grid
//!     bricks/<id>.brick          # full evolution history archive
//!     metadata.json              # ChunkMeta
//! <root>/rotation_stats.json     # per-angle success counts
//! <root>/stability_metrics.json  # stability tracker file
//! ```
//!
//! Mutations are whole-file read-modify-write under a per-file advisory
//! lock, written via sibling temp file + fsync + rename so readers never
//! observe torn JSON. Readers that only need a snapshot (the correlation
//! scan) skip the lock.

mod index;
mod lock;
mod tensor;

pub use index::{
    load_index, parse_index, save_index, truncate_text, AccessMetadata, ChunkIndex, ChunkMeta,
    IndexEntry, MAX_TEXT_LEN,
};
pub use lock::FileLock;
pub use tensor::{read_tensor, write_tensor, TENSOR_FORMAT_VERSION};

pub(crate) use tensor::{read_cells, write_cells};

use std::collections::BTreeMap;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use tracing::{debug, warn};

use crate::brick::Brick;
use crate::chunking::route_store;
use crate::codec::FrameMode;
use crate::dynamics::{ConvergenceState, RotationOutcome};
use crate::error::{MemoryError, Result};
use crate::frame::{pearson, Frame};
use crate::temperature::{compute_temperature, tier_for, Tier};

// ============================================================================
// ROOT RESOLUTION
// ============================================================================

/// Environment variable overriding the store root.
pub const ROOT_ENV_VAR: &str = "WHEELER_MEMORY_ROOT";

/// Default root directory name under the home directory.
pub const DEFAULT_ROOT_DIR: &str = ".wheeler_memory";

/// Attractors cached on the recall path.
const ATTRACTOR_CACHE_SIZE: usize = 256;

/// Resolve the store root: explicit path, then `WHEELER_MEMORY_ROOT`, then
/// `$HOME/.wheeler_memory`.
pub fn resolve_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ROOT_ENV_VAR) {
        if !p.is_empty() {
            return Ok(PathBuf::from(p));
        }
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_ROOT_DIR))
        .ok_or_else(|| {
            MemoryError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory for the memory root",
            ))
        })
}

// ============================================================================
// ATOMIC WRITES
// ============================================================================

/// Write bytes via sibling temp file, fsync, rename.
pub(crate) fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| std::ffi::OsString::from("file"));
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut file = std::fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Pretty-printed JSON through [`atomic_write_bytes`].
pub(crate) fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Outcome of a store call at the storage layer.
#[derive(Debug, Clone)]
pub struct StoreReceipt {
    /// Chunk the entry landed in.
    pub chunk: String,
    /// False when the id already existed and only metadata was refreshed.
    pub created: bool,
}

/// One scored candidate from a correlation scan, pre-ranked.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    /// Memory id.
    pub id: String,
    /// Index entry snapshot. `hit_count`/`last_accessed` reflect the bump
    /// applied by this recall.
    pub entry: IndexEntry,
    /// Raw Pearson correlation against the query attractor.
    pub similarity: f64,
    /// Temperature computed from the pre-bump access fields, so a recall
    /// reports the heat that ranked it rather than the heat it caused.
    pub temperature: f64,
    /// Tier of `temperature`.
    pub tier: Tier,
    /// `similarity + boost * temperature`; the ranking key.
    pub effective_similarity: f64,
    /// The stored attractor, for optional reconstruction.
    pub attractor: Frame,
}

/// One row of a memory listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: String,
    pub text: String,
    pub chunk: String,
    pub state: ConvergenceState,
    pub convergence_ticks: u32,
    pub timestamp: DateTime<Utc>,
    pub hit_count: u64,
    pub last_accessed: DateTime<Utc>,
    pub temperature: f64,
    pub tier: Tier,
}

// ============================================================================
// STORE
// ============================================================================

/// Chunked attractor store rooted at one directory.
///
/// All methods take `&self`; the only interior state is the attractor
/// cache. Safe to share behind an `Arc` across threads; cross-process
/// safety comes from the advisory locks.
pub struct AttractorStore {
    root: PathBuf,
    cache: Mutex<LruCache<String, Frame>>,
}

impl AttractorStore {
    /// Open (creating if needed) a store at `root`, falling back to the
    /// environment override and then the home-directory default.
    pub fn open(root: Option<PathBuf>) -> Result<Self> {
        let root = resolve_root(root)?;
        std::fs::create_dir_all(&root)?;
        let cache_size = NonZeroUsize::new(ATTRACTOR_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            root,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    /// The resolved store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunks_root(&self) -> PathBuf {
        self.root.join("chunks")
    }

    fn chunk_dir(&self, chunk: &str) -> PathBuf {
        self.chunks_root().join(chunk)
    }

    fn index_path(&self, chunk: &str) -> PathBuf {
        self.chunk_dir(chunk).join("index.json")
    }

    fn tensor_path(&self, chunk: &str, id: &str) -> PathBuf {
        self.chunk_dir(chunk)
            .join("attractors")
            .join(format!("{id}.tensor"))
    }

    fn brick_path(&self, chunk: &str, id: &str) -> PathBuf {
        self.chunk_dir(chunk)
            .join("bricks")
            .join(format!("{id}.brick"))
    }

    /// Path of the stability tracker file under this root.
    pub fn stability_path(&self) -> PathBuf {
        self.root.join("stability_metrics.json")
    }

    /// Chunks present on disk (directories with an index file), sorted.
    pub fn existing_chunks(&self) -> Vec<String> {
        let mut chunks = Vec::new();
        let Ok(entries) = std::fs::read_dir(self.chunks_root()) else {
            return chunks;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() && path.join("index.json").exists() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    chunks.push(name.to_string());
                }
            }
        }
        chunks.sort();
        chunks
    }

    // ------------------------------------------------------------------
    // Store
    // ------------------------------------------------------------------

    /// Persist a converged evolution: attractor tensor, brick, index entry,
    /// chunk metadata.
    ///
    /// Non-converged outcomes are refused. Re-storing an existing id is a
    /// content no-op that preserves the original timestamp and access
    /// fields, refreshing only the store-path metadata.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        id: &str,
        text: &str,
        chunk: Option<&str>,
        outcome: &RotationOutcome,
        brick: &Brick,
        mode: FrameMode,
        now: DateTime<Utc>,
    ) -> Result<StoreReceipt> {
        if outcome.evolution.state != ConvergenceState::Converged {
            return Err(MemoryError::NotConverged {
                state: outcome.evolution.state,
                ticks: outcome.evolution.ticks,
                diagnostics: outcome.evolution.diagnostics(),
            });
        }

        let chunk = chunk.unwrap_or_else(|| route_store(text)).to_string();
        let index_path = self.index_path(&chunk);

        let lock = FileLock::acquire(&index_path)?;
        let mut index = load_index(&index_path, &chunk)?;

        let created = match index.get_mut(id) {
            Some(existing) => {
                // Content is deterministic per id; the files on disk
                // already match. Refresh only how this store got there.
                existing.metadata.rotation_used = outcome.rotation_used;
                existing.metadata.attempts = outcome.attempts;
                existing.metadata.wall_time_seconds = outcome.wall_time_seconds;
                existing.metadata.frame_mode = mode;
                false
            }
            None => {
                write_tensor(&self.tensor_path(&chunk, id), &outcome.evolution.attractor)?;
                brick.write(&self.brick_path(&chunk, id))?;

                index.insert(
                    id.to_string(),
                    IndexEntry {
                        text: truncate_text(text),
                        chunk: chunk.clone(),
                        state: ConvergenceState::Converged,
                        convergence_ticks: outcome.evolution.ticks,
                        timestamp: now,
                        metadata: AccessMetadata {
                            hit_count: 0,
                            last_accessed: now,
                            rotation_used: outcome.rotation_used,
                            attempts: outcome.attempts,
                            wall_time_seconds: outcome.wall_time_seconds,
                            frame_mode: mode,
                        },
                    },
                );
                true
            }
        };

        save_index(&index_path, &index)?;
        drop(lock);

        self.touch_chunk_meta(&chunk, true, now)?;
        debug!(id, chunk = %chunk, created, "stored memory");
        Ok(StoreReceipt { chunk, created })
    }

    // ------------------------------------------------------------------
    // Recall scan
    // ------------------------------------------------------------------

    /// Correlation scan over `chunks`, ranked by effective similarity, with
    /// coalesced access bumps applied to the returned entries only.
    ///
    /// `min_effective` drops sub-floor candidates before the bump, so a
    /// filtered entry never counts a recall it was not returned by.
    /// Per-entry failures (missing tensor, corrupt entry) and per-chunk
    /// failures (unreadable index) are logged and skipped; a bad entry
    /// never fails the query.
    pub fn recall(
        &self,
        query: &Frame,
        chunks: &[String],
        top_k: usize,
        temperature_boost: f64,
        min_effective: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredEntry>> {
        let mut candidates: Vec<ScoredEntry> = Vec::new();

        for chunk in chunks {
            let index = match load_index(&self.index_path(chunk), chunk) {
                Ok(index) => index,
                Err(e) => {
                    warn!(chunk = %chunk, error = %e, "skipping unreadable chunk during recall");
                    continue;
                }
            };

            for (id, entry) in index {
                let attractor = match self.load_attractor(chunk, &id) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(id = %id, chunk = %chunk, error = %e, "skipping entry during recall");
                        continue;
                    }
                };

                let similarity = pearson(query, &attractor);
                let temperature = compute_temperature(
                    entry.metadata.hit_count,
                    entry.metadata.last_accessed,
                    now,
                );
                let effective_similarity = similarity + temperature_boost * temperature;

                candidates.push(ScoredEntry {
                    id,
                    entry,
                    similarity,
                    temperature,
                    tier: tier_for(temperature),
                    effective_similarity,
                    attractor,
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.effective_similarity
                .partial_cmp(&a.effective_similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(top_k);
        if let Some(floor) = min_effective {
            candidates.retain(|c| c.effective_similarity >= floor);
        }

        self.bump_access(&mut candidates, now)?;
        Ok(candidates)
    }

    /// Apply access bumps for returned entries, one locked index write per
    /// touched chunk. Read-modify-write under the lock keeps concurrent
    /// recalls additive rather than last-writer-wins.
    fn bump_access(&self, results: &mut [ScoredEntry], now: DateTime<Utc>) -> Result<()> {
        let mut by_chunk: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, r) in results.iter().enumerate() {
            by_chunk.entry(r.entry.chunk.clone()).or_default().push(i);
        }

        for (chunk, positions) in by_chunk {
            let index_path = self.index_path(&chunk);
            let lock = FileLock::acquire(&index_path)?;
            let mut index = load_index(&index_path, &chunk)?;

            for &pos in &positions {
                if let Some(entry) = index.get_mut(&results[pos].id) {
                    entry.metadata.hit_count += 1;
                    entry.metadata.last_accessed = now;
                    results[pos].entry = entry.clone();
                }
            }

            save_index(&index_path, &index)?;
            drop(lock);
            self.touch_chunk_meta(&chunk, false, now)?;
        }
        Ok(())
    }

    fn load_attractor(&self, chunk: &str, id: &str) -> Result<Frame> {
        let key = format!("{chunk}/{id}");
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(frame) = cache.get(&key) {
                return Ok(frame.clone());
            }
        }

        let path = self.tensor_path(chunk, id);
        if !path.exists() {
            return Err(MemoryError::MissingTensor {
                id: id.to_string(),
                chunk: chunk.to_string(),
            });
        }
        let frame = read_tensor(&path)?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, frame.clone());
        }
        Ok(frame)
    }

    // ------------------------------------------------------------------
    // Listing / inspection
    // ------------------------------------------------------------------

    /// Enumerate entries, optionally restricted to one chunk, with
    /// temperature computed at `now`. Unreadable chunks are skipped with a
    /// warning.
    pub fn list(&self, chunk: Option<&str>, now: DateTime<Utc>) -> Result<Vec<EntrySummary>> {
        let chunks: Vec<String> = match chunk {
            Some(c) => vec![c.to_string()],
            None => self.existing_chunks(),
        };

        let mut out = Vec::new();
        for chunk in &chunks {
            let index = match load_index(&self.index_path(chunk), chunk) {
                Ok(index) => index,
                Err(e) => {
                    warn!(chunk = %chunk, error = %e, "skipping unreadable chunk during list");
                    continue;
                }
            };
            for (id, entry) in index {
                let temperature = compute_temperature(
                    entry.metadata.hit_count,
                    entry.metadata.last_accessed,
                    now,
                );
                out.push(EntrySummary {
                    id,
                    text: entry.text,
                    chunk: entry.chunk,
                    state: entry.state,
                    convergence_ticks: entry.convergence_ticks,
                    timestamp: entry.timestamp,
                    hit_count: entry.metadata.hit_count,
                    last_accessed: entry.metadata.last_accessed,
                    temperature,
                    tier: tier_for(temperature),
                });
            }
        }
        Ok(out)
    }

    /// Load the brick for `id`, searching every chunk on disk.
    pub fn find_brick(&self, id: &str) -> Result<Brick> {
        for chunk in self.existing_chunks() {
            let path = self.brick_path(&chunk, id);
            if path.exists() {
                return Brick::read(&path);
            }
        }
        Err(MemoryError::UnknownMemory { id: id.to_string() })
    }

    // ------------------------------------------------------------------
    // Rotation stats / chunk metadata
    // ------------------------------------------------------------------

    fn rotation_stats_path(&self) -> PathBuf {
        self.root.join("rotation_stats.json")
    }

    /// Increment the success counter for a rotation angle.
    pub fn record_rotation_success(&self, angle: u32) -> Result<()> {
        let path = self.rotation_stats_path();
        let lock = FileLock::acquire(&path)?;
        let mut stats = self.rotation_stats()?;
        *stats.entry(angle.to_string()).or_insert(0) += 1;
        let result = atomic_write_json(&path, &stats);
        drop(lock);
        result
    }

    /// Per-angle success counts, zeroed for angles never seen.
    pub fn rotation_stats(&self) -> Result<BTreeMap<String, u64>> {
        let path = self.rotation_stats_path();
        let mut stats: BTreeMap<String, u64> = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => BTreeMap::new(),
        };
        for angle in crate::dynamics::ROTATION_ANGLES {
            stats.entry(angle.to_string()).or_insert(0);
        }
        Ok(stats)
    }

    fn touch_chunk_meta(&self, chunk: &str, stored: bool, now: DateTime<Utc>) -> Result<()> {
        let path = self.chunk_dir(chunk).join("metadata.json");
        let lock = FileLock::acquire(&path)?;

        let mut meta: ChunkMeta = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or(ChunkMeta::new(now)),
            Err(_) => ChunkMeta::new(now),
        };
        meta.last_accessed = now;
        if stored {
            meta.store_count += 1;
        }
        let result = atomic_write_json(&path, &meta);
        drop(lock);
        result
    }

    /// Read a chunk's metadata, if present.
    pub fn chunk_meta(&self, chunk: &str) -> Result<Option<ChunkMeta>> {
        let path = self.chunk_dir(chunk).join("metadata.json");
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MemoryError::Io(e)),
        }
    }
}

impl std::fmt::Debug for AttractorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttractorStore")
            .field("root", &self.root)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
