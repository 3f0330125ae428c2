//! Text embedders
//!
//! The engine treats the embedding model as an opaque text-to-vector
//! function behind the [`Embedder`] trait. The bundled implementation hashes
//! character trigrams and words into a fixed-size vector, which keeps the
//! pipeline fully deterministic and dependency-free; a real semantic model
//! slots in behind the same trait.
//!
//! Padding or truncating a model's native dimension to the index dimension
//! is the adapter's job ([`FixedDimEmbedder`]), never the engine's.

use crate::vector::Vector;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Opaque text-to-vector function. Output vectors are unit-normalized.
pub trait Embedder: Send + Sync {
    /// Output dimension; every embedded vector has exactly this length.
    fn dim(&self) -> usize;

    fn embed(&self, text: &str) -> Vector;

    fn embed_batch(&self, texts: &[String]) -> Vec<Vector> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Feature-hashing embedder over character trigrams and words.
///
/// Deterministic: the same text always produces the same unit vector. Words
/// contribute more than trigrams so exact token matches dominate fuzzy
/// character overlap.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "embedder dimension must be positive");
        Self { dim }
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Vector {
        let mut components = vec![0.0f32; self.dim];
        let normalized = text.to_lowercase();

        for trigram in trigrams(&normalized) {
            let pos = hash_to_bucket(&trigram, self.dim);
            components[pos] += 1.0;
        }
        for word in normalized.split_whitespace() {
            let pos = hash_to_bucket(word, self.dim);
            components[pos] += 2.0;
        }

        let mut vector = Vector::new(components);
        vector.normalize();
        vector
    }
}

fn hash_to_bucket<T: Hash + ?Sized>(value: &T, dim: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    (hasher.finish() as usize) % dim
}

fn trigrams(s: &str) -> HashSet<String> {
    let padded = format!("  {s}  ");
    let chars: Vec<char> = padded.chars().collect();
    if chars.len() < 3 {
        return HashSet::new();
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Adapts an inner embedder to a fixed target dimension.
///
/// Shorter native vectors are zero-padded (unit norm preserved); longer ones
/// are truncated. Identity pass-through when the dimensions already agree.
pub struct FixedDimEmbedder<E> {
    inner: E,
    dim: usize,
}

impl<E: Embedder> FixedDimEmbedder<E> {
    pub fn new(inner: E, dim: usize) -> Self {
        assert!(dim > 0, "target dimension must be positive");
        Self { inner, dim }
    }

    fn adapt(&self, vector: Vector) -> Vector {
        let mut data = vector.into_inner();
        if data.len() < self.dim {
            data.resize(self.dim, 0.0);
        } else {
            data.truncate(self.dim);
        }
        Vector::new(data)
    }
}

impl<E: Embedder> Embedder for FixedDimEmbedder<E> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Vector {
        self.adapt(self.inner.embed(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Vec<Vector> {
        self.inner
            .embed_batch(texts)
            .into_iter()
            .map(|v| self.adapt(v))
            .collect()
    }
}
