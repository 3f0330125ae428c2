use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tunables for the duplicate check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Index and embedder output dimension
    pub vector_dim: usize,
    /// Candidates fetched per check
    pub top_k: usize,
    /// Minimum best score to flag a duplicate
    pub threshold: f32,
    /// Candidates returned as evidence
    pub max_evidence: usize,
    /// Classifier artifact location; absent file selects the rule-based
    /// fallback
    pub model_path: PathBuf,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            vector_dim: 512,
            top_k: 200,
            threshold: 0.82,
            max_evidence: 10,
            model_path: PathBuf::from("model.bin"),
        }
    }
}
