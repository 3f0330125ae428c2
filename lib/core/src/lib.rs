//! # identx Core
//!
//! Core library for the identx identity-resolution engine.
//!
//! This crate provides the deterministic half of the pipeline:
//!
//! - [`normalize`] - per-field canonicalization of identity attributes
//! - [`record`] - raw and normalized identity shapes plus canonical text
//! - [`features`] - fixed-order query/candidate feature extraction
//! - [`classifier`] - rule-based and trained duplicate classifiers
//! - [`store`] - path-keyed classifier artifact cache
//!
//! ## Example
//!
//! ```rust
//! use identx_core::{Classifier, IdentityRecord, NormalizedIdentity, RuleBasedClassifier};
//! use identx_core::features::feature_row;
//!
//! let record = IdentityRecord {
//!     full_name: Some("Anita Sharma".to_string()),
//!     email: Some("anita.sharma@gmail.com".to_string()),
//!     ..Default::default()
//! };
//! let query = NormalizedIdentity::from_record(&record);
//! let candidate = query.clone();
//!
//! let row = feature_row(&query, &candidate, 0.05);
//! let score = RuleBasedClassifier::new().predict(&[row])[0];
//! assert!(score > 0.0);
//! ```

pub mod classifier;
pub mod error;
pub mod features;
pub mod normalize;
pub mod record;
pub mod store;

pub use classifier::{
    Classifier, LoadedClassifier, RuleBasedClassifier, RuleWeights, TrainedClassifier,
};
pub use error::{Error, Result};
pub use features::{feature_row, FeatureRow, DOB_DELTA_SENTINEL, FEATURE_COUNT};
pub use record::{CandidateMatch, DuplicateDecision, IdentityRecord, NormalizedIdentity};
pub use store::ModelStore;
