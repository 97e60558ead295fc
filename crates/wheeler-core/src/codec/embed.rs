//! fastembed-backed sentence embedder
//!
//! Local ONNX inference with all-MiniLM-L6-v2, the fixed 384-dimension
//! model behind embedding-mode frames. Model choice is frozen: swapping
//! models changes every embedding-mode frame and id.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{EmbeddingError, TextEmbedder, EMBED_DIM};

/// Default cache directory for fastembed model files.
///
/// Respects `FASTEMBED_CACHE_PATH`, then falls back to the platform cache
/// directory, then to a dot-directory in the working tree.
fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("FASTEMBED_CACHE_PATH") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("io", "wheeler", "memory") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

/// Sentence embedder running all-MiniLM-L6-v2 locally.
///
/// The fastembed session requires `&mut` for inference, so the model sits
/// behind a mutex; the embedding call is the one blocking suspension point
/// on the encode path.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    /// Initialize the model, downloading it into the cache directory on
    /// first use.
    pub fn new() -> Result<Self, EmbeddingError> {
        let cache = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&cache) {
            tracing::warn!("failed to create fastembed cache dir {:?}: {}", cache, e);
        }

        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(false)
            .with_cache_dir(cache);

        let model = TextEmbedding::try_new(options).map_err(|e| {
            EmbeddingError::ModelInit(format!(
                "failed to initialize all-MiniLM-L6-v2: {e}. Ensure the ONNX runtime is \
                 available and model files can be downloaded."
            ))
        })?;

        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl TextEmbedder for FastEmbedder {
    fn dimensions(&self) -> usize {
        EMBED_DIM
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("model returned no vector".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("model lock poisoned: {e}")))?;

        let vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        for v in &vectors {
            if v.len() != EMBED_DIM {
                return Err(EmbeddingError::WrongDimensions {
                    found: v.len(),
                    expected: EMBED_DIM,
                });
            }
        }
        Ok(vectors)
    }
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model", &"all-MiniLM-L6-v2")
            .field("dimensions", &EMBED_DIM)
            .finish()
    }
}
