//! Pattern stability metrics
//!
//! Tracks three dimensions of pattern stability and combines them into a
//! composite score in [0, 1]:
//!
//! 1. **Hit count** - activation frequency (how often a pattern is recalled)
//! 2. **Frame persistence** - survival across context switches
//! 3. **Compression survival** - whether a pattern outlived consolidation
//!
//! The tracker is an engine-owned component (no process-wide singleton)
//! backed by one JSON file. Its I/O failures are warnings only and never
//! affect store/recall outcomes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::atomic_write_json;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Composite weight of the hit-count component.
pub const WEIGHT_HITS: f64 = 0.40;

/// Composite weight of the frame-persistence component.
pub const WEIGHT_PERSISTENCE: f64 = 0.35;

/// Composite weight of the compression-survival component.
pub const WEIGHT_COMPRESSION: f64 = 0.25;

/// Hits at which the logarithmic hit score saturates at 1.0.
pub const HIT_SCORE_SATURATION: u64 = 20;

/// A pattern accessed within this window of a context switch counts as
/// having persisted through it.
pub const PERSISTENCE_WINDOW_MINUTES: i64 = 10;

/// Characters of pattern text kept for identification.
pub const TEXT_PREVIEW_LEN: usize = 80;

/// Stability file format version.
pub const STABILITY_FORMAT_VERSION: u32 = 1;

// ============================================================================
// PATTERN METRICS
// ============================================================================

/// Stability metrics for a single pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMetrics {
    /// Pattern id: hash of the pattern text.
    pub pattern_id: String,
    /// First characters of the text, for identification.
    #[serde(default)]
    pub text_preview: String,
    /// Activation frequency.
    #[serde(default)]
    pub hit_count: u64,
    /// Context switches this pattern stayed relevant through.
    #[serde(default)]
    pub frame_persistence: u64,
    /// Total context switches observed since first seen.
    #[serde(default)]
    pub context_switches_seen: u64,
    /// Survived consolidation compression.
    #[serde(default)]
    pub compression_survived: bool,
    /// When the pattern was first tracked.
    pub first_seen: DateTime<Utc>,
    /// Last activation.
    pub last_accessed: DateTime<Utc>,
}

impl PatternMetrics {
    fn new(pattern_id: String, text: &str, now: DateTime<Utc>) -> Self {
        Self {
            pattern_id,
            text_preview: text.chars().take(TEXT_PREVIEW_LEN).collect(),
            hit_count: 0,
            frame_persistence: 0,
            context_switches_seen: 0,
            compression_survived: false,
            first_seen: now,
            last_accessed: now,
        }
    }

    /// Composite stability score in [0, 1].
    ///
    /// Hit count scales logarithmically and saturates near
    /// [`HIT_SCORE_SATURATION`] hits. Persistence is the survival ratio,
    /// with two pre-switch special cases: no switches and no persistence
    /// scores 0, while persistence recorded before any switch scores 0.5.
    pub fn stability_score(&self) -> f64 {
        let hit_score = if self.hit_count == 0 {
            0.0
        } else {
            ((self.hit_count as f64 + 1.0).ln() / (HIT_SCORE_SATURATION as f64 + 1.0).ln()).min(1.0)
        };

        let persist_score = if self.context_switches_seen == 0 {
            if self.frame_persistence == 0 { 0.0 } else { 0.5 }
        } else {
            (self.frame_persistence as f64 / self.context_switches_seen as f64).min(1.0)
        };

        let compress_score = if self.compression_survived { 1.0 } else { 0.0 };

        let composite = WEIGHT_HITS * hit_score
            + WEIGHT_PERSISTENCE * persist_score
            + WEIGHT_COMPRESSION * compress_score;
        (composite * 10_000.0).round() / 10_000.0
    }
}

/// One row of a stability report, sorted output of [`StabilityTracker::all_scored`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPattern {
    pub pattern_id: String,
    pub text_preview: String,
    pub stability_score: f64,
    pub hit_count: u64,
    pub frame_persistence: u64,
    pub compression_survived: bool,
}

// ============================================================================
// ON-DISK FORMAT
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StabilityFile {
    version: u32,
    updated: DateTime<Utc>,
    patterns: Vec<PatternMetrics>,
}

// ============================================================================
// TRACKER
// ============================================================================

/// Tracks and persists stability metrics for memory patterns.
#[derive(Debug)]
pub struct StabilityTracker {
    path: PathBuf,
    patterns: HashMap<String, PatternMetrics>,
    dirty: bool,
}

impl StabilityTracker {
    /// Load the tracker from `path`, tolerating a missing or unreadable
    /// file (an empty tracker, with a warning for the unreadable case).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut patterns = HashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<StabilityFile>(&contents) {
                Ok(file) if file.version == STABILITY_FORMAT_VERSION => {
                    for p in file.patterns {
                        patterns.insert(p.pattern_id.clone(), p);
                    }
                }
                Ok(file) => {
                    warn!(
                        found = file.version,
                        expected = STABILITY_FORMAT_VERSION,
                        "stability file version mismatch; starting empty"
                    );
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable stability file; starting empty");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read stability file; starting empty");
            }
        }

        Self {
            path,
            patterns,
            dirty: false,
        }
    }

    /// Record an activation of a pattern. Creates the record on first hit.
    pub fn record_hit(&mut self, pattern_id: &str, text: &str) -> f64 {
        self.record_hit_at(pattern_id, text, Utc::now())
    }

    /// Clock-injectable form of [`record_hit`](Self::record_hit).
    pub fn record_hit_at(&mut self, pattern_id: &str, text: &str, now: DateTime<Utc>) -> f64 {
        let metrics = self
            .patterns
            .entry(pattern_id.to_string())
            .or_insert_with(|| PatternMetrics::new(pattern_id.to_string(), text, now));
        metrics.hit_count += 1;
        metrics.last_accessed = now;
        self.dirty = true;
        metrics.stability_score()
    }

    /// Record a context switch across every tracked pattern.
    ///
    /// Patterns accessed within the last [`PERSISTENCE_WINDOW_MINUTES`]
    /// also gain frame persistence: they stayed relevant across the switch.
    pub fn record_context_switch(&mut self) {
        self.record_context_switch_at(Utc::now());
    }

    /// Clock-injectable form of [`record_context_switch`](Self::record_context_switch).
    pub fn record_context_switch_at(&mut self, now: DateTime<Utc>) {
        let threshold = now - Duration::minutes(PERSISTENCE_WINDOW_MINUTES);
        for metrics in self.patterns.values_mut() {
            metrics.context_switches_seen += 1;
            if metrics.last_accessed >= threshold {
                metrics.frame_persistence += 1;
            }
        }
        self.dirty = true;
    }

    /// Mark a pattern as having survived consolidation compression.
    /// Unknown ids are ignored.
    pub fn record_compression_survival(&mut self, pattern_id: &str) {
        if let Some(metrics) = self.patterns.get_mut(pattern_id) {
            metrics.compression_survived = true;
            self.dirty = true;
        }
    }

    /// Stability score for a pattern; 0.0 when untracked.
    pub fn score(&self, pattern_id: &str) -> f64 {
        self.patterns
            .get(pattern_id)
            .map(|m| m.stability_score())
            .unwrap_or(0.0)
    }

    /// Full metrics for a pattern.
    pub fn metrics(&self, pattern_id: &str) -> Option<&PatternMetrics> {
        self.patterns.get(pattern_id)
    }

    /// Every tracked pattern with its score, highest first.
    pub fn all_scored(&self) -> Vec<ScoredPattern> {
        let mut out: Vec<ScoredPattern> = self
            .patterns
            .values()
            .map(|m| ScoredPattern {
                pattern_id: m.pattern_id.clone(),
                text_preview: m.text_preview.clone(),
                stability_score: m.stability_score(),
                hit_count: m.hit_count,
                frame_persistence: m.frame_persistence,
                compression_survived: m.compression_survived,
            })
            .collect();
        out.sort_by(|a, b| {
            b.stability_score
                .partial_cmp(&a.stability_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }

    /// Number of tracked patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Persist to disk if dirty. Failures are logged and swallowed:
    /// stability bookkeeping must never fail a store or recall.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        let mut patterns: Vec<&PatternMetrics> = self.patterns.values().collect();
        patterns.sort_by(|a, b| a.pattern_id.cmp(&b.pattern_id));
        let file = StabilityFile {
            version: STABILITY_FORMAT_VERSION,
            updated: Utc::now(),
            patterns: patterns.into_iter().cloned().collect(),
        };
        match atomic_write_json(&self.path, &file) {
            Ok(()) => self.dirty = false,
            Err(e) => warn!(path = %self.path.display(), error = %e, "stability flush failed"),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StabilityTracker {
    fn drop(&mut self) {
        self.flush();
    }
}

// ============================================================================
// TESTS
// ============================================================================
