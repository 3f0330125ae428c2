//! # identx Training
//!
//! Offline half of the identx pipeline:
//!
//! - [`dataset`] - raw identity CSV loading and index building
//! - [`cache`] - content-keyed embedding cache for resumable runs
//! - [`pairs`] - duplicate-cluster mining into labeled query/candidate pairs
//!   with one hard negative per query
//! - [`trainer`] - class-balanced logistic fitting and artifact persistence
//!
//! The online engine never depends on this crate; the two halves only share
//! `identx-core` types and the pair-file format.

pub mod cache;
pub mod dataset;
pub mod error;
pub mod pairs;
pub mod trainer;

pub use cache::EmbeddingCache;
pub use dataset::{build_index, load_identities, RawIdentityRow};
pub use error::{Error, Result};
pub use pairs::{generate_pairs, PairGenConfig, PairGenStats, TrainingPair};
pub use trainer::{train, train_or_generate, TrainingReport};
