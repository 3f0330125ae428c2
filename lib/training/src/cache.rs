//! Embedding cache for the offline pipeline
//!
//! Embedding a large dataset dominates pair-generation time, so the computed
//! vectors are persisted keyed by a digest of the input content (canonical
//! texts plus embedder dimension). Rerunning the pipeline over an unchanged
//! dataset resumes from the cache; any content change produces a new key.

use crate::error::{Error, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use identx_index::{Embedder, Vector};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct EmbeddingCache {
    dir: PathBuf,
}

impl EmbeddingCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn cache_path(&self, texts: &[String], dim: usize) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(dim.to_le_bytes());
        // Length-prefix each text so a differently-split list can never
        // produce the same byte stream
        for text in texts {
            hasher.update((text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        let key = format!("{:x}", hasher.finalize());
        self.dir.join(format!("{key}.emb"))
    }

    /// Return the embeddings for `texts`, from cache when the content key
    /// matches a previous run, computing and persisting them otherwise.
    pub fn get_or_compute(&self, texts: &[String], embedder: &dyn Embedder) -> Result<Vec<Vector>> {
        let path = self.cache_path(texts, embedder.dim());

        if path.exists() {
            match Self::read(&path, texts.len(), embedder.dim()) {
                Ok(vectors) => {
                    info!(count = vectors.len(), path = %path.display(), "reusing cached embeddings");
                    return Ok(vectors);
                }
                Err(e) => {
                    // Stale or damaged cache entry: recompute rather than fail
                    warn!(path = %path.display(), error = %e, "discarding unreadable embedding cache");
                }
            }
        }

        debug!(count = texts.len(), "embedding dataset");
        let vectors = embedder.embed_batch(texts);
        let raw: Vec<Vec<f32>> = vectors.iter().map(|v| v.as_slice().to_vec()).collect();
        let bytes = bincode::serialize(&raw).map_err(|e| Error::Serialization(e.to_string()))?;
        AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&bytes))
            .map_err(|e| match e {
                atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => Error::Io(e),
            })?;
        Ok(vectors)
    }

    fn read(path: &Path, expected_count: usize, expected_dim: usize) -> Result<Vec<Vector>> {
        let bytes = std::fs::read(path)?;
        let raw: Vec<Vec<f32>> =
            bincode::deserialize(&bytes).map_err(|e| Error::Serialization(e.to_string()))?;
        if raw.len() != expected_count || raw.iter().any(|v| v.len() != expected_dim) {
            return Err(Error::Serialization(
                "cached embeddings do not match dataset shape".to_string(),
            ));
        }
        Ok(raw.into_iter().map(Vector::new).collect())
    }
}
