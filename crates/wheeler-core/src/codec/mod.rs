//! Frame codec - deterministic text to seed-frame conversion
//!
//! Two modes share one output contract (64x64, values in [-1, 1]) so the
//! rest of the engine never cares which produced a frame:
//!
//! - **Hash mode** (default): SHA-256 seeds a PCG64 generator that fills the
//!   frame with uniform noise. Deterministic, semantics-destroying; similar
//!   text maps to unrelated frames by design.
//! - **Embedding mode**: a sentence embedding is projected into frame space
//!   through a fixed Gaussian random matrix (Johnson-Lindenstrauss), so
//!   similar text produces similar frames and fuzzy recall works.
//!
//! The embedding model itself is an external collaborator behind the
//! [`TextEmbedder`] trait; a fastembed-backed value ships behind the
//! `embeddings` cargo feature.

#[cfg(feature = "embeddings")]
#[cfg_attr(docsrs, doc(cfg(feature = "embeddings")))]
mod embed;

#[cfg(feature = "embeddings")]
pub use embed::FastEmbedder;

use std::sync::OnceLock;

use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MemoryError, Result};
use crate::frame::{Frame, CELLS};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Sentence embedding width expected from any [`TextEmbedder`].
pub const EMBED_DIM: usize = 384;

/// Fixed seed for the Gaussian projection matrix. Frozen: changing it makes
/// every embedding-mode frame (and id) incompatible.
pub const PROJECTION_SEED: u64 = 0xDEAD_BEEF;

/// Pre-tanh gain. The raw projection concentrates near zero; the gain
/// spreads values across most of (-1, 1).
pub const EMBED_SCALE: f32 = 3.0;

// ============================================================================
// FRAME MODE
// ============================================================================

/// Which codec produced a frame. Recorded per entry so recall can warn when
/// query and stored modes disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameMode {
    /// SHA-256 seeded uniform noise.
    #[default]
    Hash,
    /// Sentence embedding through the fixed Gaussian projection.
    Embedding,
}

impl FrameMode {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameMode::Hash => "hash",
            FrameMode::Embedding => "embedding",
        }
    }
}

impl std::fmt::Display for FrameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// EMBEDDER CAPABILITY
// ============================================================================

/// Embedding error types, kept separate from [`MemoryError`] because the
/// model boundary is an external collaborator.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model.
    #[error("model initialization failed: {0}")]
    ModelInit(String),
    /// Failed to generate an embedding.
    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),
    /// The model returned a vector of unexpected width.
    #[error("embedding has {found} dimensions, expected {expected}")]
    WrongDimensions { found: usize, expected: usize },
}

/// Capability interface for sentence embedding models.
///
/// Implementations must be pure: the same text always yields the same
/// vector, because the storage id of an embedding-mode memory is a hash of
/// the vector bytes.
pub trait TextEmbedder: Send + Sync {
    /// Vector width this embedder produces. Must equal [`EMBED_DIM`].
    fn dimensions(&self) -> usize;

    /// Embed one text.
    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts in one model invocation.
    fn embed_batch(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

// ============================================================================
// HASH MODE (free functions; no state involved)
// ============================================================================

/// SHA-256 hex digest of the text. The storage id in hash mode.
pub fn text_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex_string(&digest)
}

/// Deterministic seed frame from text via SHA-256 seeded PCG64.
///
/// The first 8 digest bytes, big-endian, seed the generator; 4096 uniform
/// draws in [-1, 1) fill the grid row-major.
pub fn hash_frame(text: &str) -> Frame {
    let digest = Sha256::digest(text.as_bytes());
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    let seed = u64::from_be_bytes(seed_bytes);

    let mut rng = Pcg64::seed_from_u64(seed);
    let mut frame = Frame::zeroed();
    for v in frame.as_mut_slice() {
        *v = rng.random_range(-1.0f32..1.0f32);
    }
    frame
}

fn hex_string(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // Writing to a String cannot fail.
        let _ = write!(s, "{b:02x}");
    }
    s
}

// ============================================================================
// CODEC
// ============================================================================

/// A frame produced by the codec, with its storage id and mode.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// The seed frame.
    pub frame: Frame,
    /// Content-derived storage id (hex).
    pub id: String,
    /// Which mode produced the frame.
    pub mode: FrameMode,
}

/// Text-to-frame codec holding the optional embedder and the lazily built
/// projection matrix.
pub struct FrameCodec {
    embedder: Option<Box<dyn TextEmbedder>>,
    // 384 x 4096 row-major Gaussian matrix, built once on first embedding
    // use (6 MB; hash-only deployments never pay for it).
    projection: OnceLock<Vec<f32>>,
}

impl FrameCodec {
    /// Hash-mode-only codec.
    pub fn new() -> Self {
        Self {
            embedder: None,
            projection: OnceLock::new(),
        }
    }

    /// Codec with an embedding model wired in.
    pub fn with_embedder(embedder: Box<dyn TextEmbedder>) -> Self {
        Self {
            embedder: Some(embedder),
            projection: OnceLock::new(),
        }
    }

    /// Whether embedding mode is available.
    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    /// Encode one text in the requested mode.
    pub fn encode(&self, text: &str, mode: FrameMode) -> Result<EncodedFrame> {
        match mode {
            FrameMode::Hash => Ok(EncodedFrame {
                frame: hash_frame(text),
                id: text_id(text),
                mode,
            }),
            FrameMode::Embedding => {
                let embedder = self.embedder.as_ref().ok_or(MemoryError::EmbeddingUnavailable)?;
                let vector = embedder.embed(text)?;
                self.frame_from_embedding(&vector)
            }
        }
    }

    /// Encode many texts. Embedding mode runs a single model invocation.
    pub fn encode_batch(&self, texts: &[&str], mode: FrameMode) -> Result<Vec<EncodedFrame>> {
        match mode {
            FrameMode::Hash => Ok(texts
                .iter()
                .map(|t| EncodedFrame {
                    frame: hash_frame(t),
                    id: text_id(t),
                    mode,
                })
                .collect()),
            FrameMode::Embedding => {
                let embedder = self.embedder.as_ref().ok_or(MemoryError::EmbeddingUnavailable)?;
                let vectors = embedder.embed_batch(texts)?;
                vectors
                    .iter()
                    .map(|v| self.frame_from_embedding(v))
                    .collect()
            }
        }
    }

    /// Project a 384-dim embedding into frame space.
    ///
    /// `frame[j] = tanh(3 * sum_i emb[i] * P[i][j])` with P the fixed
    /// Gaussian matrix scaled by 1/sqrt(4096). The id is the SHA-256 of the
    /// embedding's little-endian bytes, so identical text keys identically
    /// regardless of its own hash.
    fn frame_from_embedding(&self, embedding: &[f32]) -> Result<EncodedFrame> {
        if embedding.len() != EMBED_DIM {
            return Err(MemoryError::Embedding(EmbeddingError::WrongDimensions {
                found: embedding.len(),
                expected: EMBED_DIM,
            }));
        }

        let proj = self.projection.get_or_init(build_projection);

        let mut flat = vec![0.0f32; CELLS];
        for (i, e) in embedding.iter().enumerate() {
            let row = &proj[i * CELLS..(i + 1) * CELLS];
            for (j, p) in row.iter().enumerate() {
                flat[j] += e * p;
            }
        }
        for v in flat.iter_mut() {
            *v = (*v * EMBED_SCALE).tanh();
        }

        let mut hasher = Sha256::new();
        for e in embedding {
            hasher.update(e.to_le_bytes());
        }
        let id = hex_string(&hasher.finalize());

        let mut frame = Frame::zeroed();
        frame.as_mut_slice().copy_from_slice(&flat);

        Ok(EncodedFrame {
            frame,
            id,
            mode: FrameMode::Embedding,
        })
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("embedder", &self.embedder.is_some())
            .field("projection_built", &self.projection.get().is_some())
            .finish()
    }
}

/// The fixed 384 -> 4096 Gaussian projection, row-major, entries scaled by
/// 1/sqrt(4096) so projected norms approximate embedding norms.
fn build_projection() -> Vec<f32> {
    let mut rng = Pcg64::seed_from_u64(PROJECTION_SEED);
    let scale = 1.0 / (CELLS as f32).sqrt();
    let mut matrix = vec![0.0f32; EMBED_DIM * CELLS];
    for v in matrix.iter_mut() {
        let n: f32 = rng.sample(StandardNormal);
        *v = n * scale;
    }
    matrix
}

// ============================================================================
// TESTS
// ============================================================================
