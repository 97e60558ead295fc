//! Error types for the memory engine surface.
//!
//! One enum covers the whole store/recall/storage boundary. Per-entry
//! failures during recall are deliberately NOT surfaced through this type;
//! the recall loop logs and skips them so a single bad entry never fails a
//! query.

use std::path::PathBuf;

use crate::dynamics::{ConvergenceState, EvolutionDiagnostics};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Errors surfaced by store, recall, and the storage layer.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Store or recall called with zero-length text.
    #[error("empty input text")]
    EmptyInput,

    /// Evolution failed to converge on every rotation; nothing was persisted.
    #[error("evolution did not converge: {state} after {ticks} ticks")]
    NotConverged {
        state: ConvergenceState,
        ticks: u32,
        diagnostics: EvolutionDiagnostics,
    },

    /// A chunk index file failed to parse or an internal consistency check.
    /// Recovery drops the offending entry, never the whole chunk.
    #[error("corrupt index in chunk '{chunk}': {reason}")]
    CorruptIndex { chunk: String, reason: String },

    /// An attractor tensor file referenced by the index is missing.
    #[error("missing attractor tensor for '{id}' in chunk '{chunk}'")]
    MissingTensor { id: String, chunk: String },

    /// Lock contention beyond the backoff ceiling. Retryable by the caller.
    #[error("file busy: {path}")]
    Busy { path: PathBuf },

    /// Embedding mode requested but no embedder is wired into the engine.
    #[error("embedding mode requested but no text embedder is configured")]
    EmbeddingUnavailable,

    /// On-disk container format version not supported by this build.
    #[error("unsupported format version {found} (expected {expected})")]
    VersionMismatch { found: u16, expected: u16 },

    /// A tensor or brick container is malformed (bad magic, truncated body).
    #[error("malformed file {path}: {reason}")]
    MalformedFile { path: PathBuf, reason: String },

    /// No stored memory with this id in any chunk.
    #[error("no stored memory with id '{id}'")]
    UnknownMemory { id: String },

    /// Text embedding failed.
    #[error(transparent)]
    Embedding(#[from] crate::codec::EmbeddingError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
