//! # identx
//!
//! Fuzzy identity resolution: decides whether an incoming identity record
//! refers to an already-known entity using multi-attribute matching instead
//! of exact-key lookup.
//!
//! ## Pipeline
//!
//! 1. Normalize the record's attributes and render canonical identity text
//! 2. Embed the canonical text into a fixed-dimension unit vector
//! 3. Retrieve the nearest stored identities by vector distance
//! 4. Compare query and candidate field by field into a feature row
//! 5. Score each candidate with the active classifier and rank
//!
//! ## Quick Start
//!
//! ```rust
//! use identx::prelude::*;
//! use std::sync::Arc;
//!
//! let embedder = Arc::new(FixedDimEmbedder::new(HashingEmbedder::new(256), 512));
//! let index = Arc::new(IdentityIndex::new(512));
//!
//! // Store a known identity
//! let known = IdentityRecord {
//!     full_name: Some("Anita Sharma".to_string()),
//!     phone: Some("+91 98765 43210".to_string()),
//!     ..Default::default()
//! };
//! let identity = NormalizedIdentity::from_record(&known);
//! let vector = embedder.embed(&identity.canonical_text());
//! index.insert(StoredIdentity::new(1, identity, vector)).unwrap();
//!
//! // Check an incoming applicant against it
//! let deduper = Deduper::new(
//!     embedder,
//!     index,
//!     Arc::new(ModelStore::new()),
//!     DedupeConfig::default(),
//! );
//! let decision = deduper.check(&known).unwrap();
//! assert_eq!(decision.is_duplicate, decision.score >= decision.threshold);
//! ```
//!
//! ## Crate Structure
//!
//! - `identx-core` - normalization, canonical text, features, classifiers
//! - `identx-index` - embedders and in-memory candidate retrieval
//! - `identx-engine` - the deduplication orchestrator
//! - `identx-training` - offline pair mining and classifier training

// Re-export core types
pub use identx_core::{
    CandidateMatch, Classifier, DuplicateDecision, FeatureRow, IdentityRecord, LoadedClassifier,
    ModelStore, NormalizedIdentity, RuleBasedClassifier, RuleWeights, TrainedClassifier,
    DOB_DELTA_SENTINEL, FEATURE_COUNT,
};

// Re-export the vector side
pub use identx_index::{
    CandidateRetriever, Embedder, FixedDimEmbedder, HashingEmbedder, IdentityIndex,
    RetrievedCandidate, StoredIdentity, Vector,
};

// Re-export the engine
pub use identx_engine::{CancelToken, DedupeConfig, Deduper};

// Re-export the offline pipeline
pub use identx_training::{
    build_index, generate_pairs, load_identities, train, train_or_generate, EmbeddingCache,
    PairGenConfig, PairGenStats, RawIdentityRow, TrainingPair, TrainingReport,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        build_index, generate_pairs, load_identities, train, train_or_generate, CancelToken,
        CandidateMatch, CandidateRetriever, Classifier, DedupeConfig, Deduper, DuplicateDecision,
        Embedder, EmbeddingCache, FeatureRow, FixedDimEmbedder, HashingEmbedder, IdentityIndex,
        IdentityRecord, ModelStore, NormalizedIdentity, PairGenConfig, RuleBasedClassifier,
        StoredIdentity, TrainedClassifier, TrainingPair, TrainingReport, Vector,
    };
}
