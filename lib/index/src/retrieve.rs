//! Candidate retrieval
//!
//! The orchestrator only depends on the [`CandidateRetriever`] contract:
//! given a query vector and K, return the K nearest stored identities
//! ascending by vector distance. The contract is stateless per call; any
//! transient query-side state lives on the caller's stack, never in a shared
//! scratch row, so concurrent checks need no coordination.

use crate::error::{Error, Result};
use crate::vector::Vector;
use ahash::AHashSet;
use identx_core::NormalizedIdentity;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A stored identity: normalized fields plus the canonical text they render
/// to and the embedding of that text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub customer_id: u64,
    pub identity: NormalizedIdentity,
    pub canonical_text: String,
    pub vector: Vector,
}

impl StoredIdentity {
    pub fn new(customer_id: u64, identity: NormalizedIdentity, vector: Vector) -> Self {
        let canonical_text = identity.canonical_text();
        Self {
            customer_id,
            identity,
            canonical_text,
            vector,
        }
    }
}

/// One retrieval hit: the stored identity's projected fields plus its vector
/// distance to the query.
#[derive(Debug, Clone)]
pub struct RetrievedCandidate {
    pub customer_id: u64,
    pub vdist: f32,
    pub identity: NormalizedIdentity,
}

/// Top-K retrieval by vector distance, ascending.
pub trait CandidateRetriever: Send + Sync {
    /// Return the `k` nearest stored identities to `query`.
    ///
    /// Rejects query vectors whose length differs from the configured
    /// dimension. An empty result is valid, not an error.
    fn top_k(&self, query: &Vector, k: usize) -> Result<Vec<RetrievedCandidate>>;
}

/// In-memory identity table with brute-force nearest-neighbor retrieval.
///
/// Parallelizes the distance scan with rayon; the sort is stable so equal
/// distances keep insertion order. Reads take a shared lock, which keeps
/// concurrent checks isolated without per-request setup.
pub struct IdentityIndex {
    dim: usize,
    rows: RwLock<Vec<StoredIdentity>>,
}

impl IdentityIndex {
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "index dimension must be positive");
        Self {
            dim,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Insert a stored identity, rejecting dimension mismatches and reused
    /// ids.
    pub fn insert(&self, row: StoredIdentity) -> Result<()> {
        if row.vector.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: row.vector.dim(),
            });
        }
        let mut rows = self.rows.write();
        if rows.iter().any(|r| r.customer_id == row.customer_id) {
            return Err(Error::DuplicateId(row.customer_id));
        }
        rows.push(row);
        Ok(())
    }

    /// Look up one stored identity by id.
    pub fn get(&self, customer_id: u64) -> Option<StoredIdentity> {
        self.rows
            .read()
            .iter()
            .find(|r| r.customer_id == customer_id)
            .cloned()
    }

    /// Clone the full table, used by the offline pair-generation pipeline as
    /// a read-only precomputed vector table.
    pub fn snapshot(&self) -> Vec<StoredIdentity> {
        self.rows.read().clone()
    }
}

impl CandidateRetriever for IdentityIndex {
    fn top_k(&self, query: &Vector, k: usize) -> Result<Vec<RetrievedCandidate>> {
        if query.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: query.dim(),
            });
        }

        let rows = self.rows.read();
        let mut scored: Vec<(usize, f32)> = rows
            .par_iter()
            .enumerate()
            .map(|(i, row)| (i, row.vector.l2_distance(query)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        debug!(candidates = scored.len(), k, "retrieved nearest identities");

        Ok(scored
            .into_iter()
            .map(|(i, vdist)| RetrievedCandidate {
                customer_id: rows[i].customer_id,
                vdist,
                identity: rows[i].identity.clone(),
            })
            .collect())
    }
}

/// Mine a hard negative through the retrieval contract: the nearest identity
/// whose id is not in `exclude`. Returns `None` when the top `k` neighbors
/// are all cluster members.
pub fn mine_hard_negative(
    retriever: &dyn CandidateRetriever,
    query: &Vector,
    exclude: &AHashSet<u64>,
    k: usize,
) -> Result<Option<u64>> {
    let hits = retriever.top_k(query, k)?;
    Ok(hits
        .into_iter()
        .map(|hit| hit.customer_id)
        .find(|id| !exclude.contains(id)))
}
