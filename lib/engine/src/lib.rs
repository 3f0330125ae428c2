//! # identx Engine
//!
//! The deduplication orchestrator: one [`Deduper::check`] call normalizes an
//! incoming identity record, embeds its canonical text, retrieves the nearest
//! stored identities, scores each with the active classifier and returns a
//! ranked [`identx_core::DuplicateDecision`].
//!
//! The engine owns no I/O beyond its collaborators: the embedder and the
//! candidate retriever are trait objects, and the classifier cache is an
//! explicit [`identx_core::ModelStore`] passed in at construction.

pub mod cancel;
pub mod config;
pub mod deduper;
pub mod error;

pub use cancel::CancelToken;
pub use config::DedupeConfig;
pub use deduper::Deduper;
pub use error::{Error, Result};
