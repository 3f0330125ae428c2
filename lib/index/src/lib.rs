//! # identx Index
//!
//! Vector side of the identx pipeline:
//!
//! - [`Vector`] - dense vector with distance and normalization operations
//! - [`Embedder`] - opaque text-to-vector contract, with a deterministic
//!   feature-hashing implementation and a fixed-dimension adapter
//! - [`CandidateRetriever`] - top-K-by-distance retrieval contract, with an
//!   in-memory brute-force [`IdentityIndex`]
//!
//! ## Example
//!
//! ```rust
//! use identx_core::{IdentityRecord, NormalizedIdentity};
//! use identx_index::{
//!     CandidateRetriever, Embedder, FixedDimEmbedder, HashingEmbedder, IdentityIndex,
//!     StoredIdentity,
//! };
//!
//! let embedder = FixedDimEmbedder::new(HashingEmbedder::new(64), 128);
//! let index = IdentityIndex::new(128);
//!
//! let identity = NormalizedIdentity::from_record(&IdentityRecord {
//!     full_name: Some("Anita Sharma".to_string()),
//!     ..Default::default()
//! });
//! let vector = embedder.embed(&identity.canonical_text());
//! index.insert(StoredIdentity::new(1, identity, vector.clone())).unwrap();
//!
//! let hits = index.top_k(&vector, 10).unwrap();
//! assert_eq!(hits[0].customer_id, 1);
//! ```

pub mod embed;
pub mod error;
pub mod retrieve;
pub mod vector;

pub use embed::{Embedder, FixedDimEmbedder, HashingEmbedder};
pub use error::{Error, Result};
pub use retrieve::{
    mine_hard_negative, CandidateRetriever, IdentityIndex, RetrievedCandidate, StoredIdentity,
};
pub use vector::Vector;
