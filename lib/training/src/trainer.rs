//! Classifier training
//!
//! Consumes a labeled pair file, reconstructs each query's canonical text
//! and feature row against the stored candidate, fits the class-balanced
//! logistic model and persists it through the artifact store. A missing pair
//! file is an expected operational condition and comes back as a structured
//! failure report, not an error; hard failures are reserved for real faults
//! like an unwritable artifact.

use crate::error::Result;
use crate::pairs::{generate_pairs, PairGenConfig, TrainingPair};
use identx_core::features::feature_row;
use identx_core::{FeatureRow, ModelStore, NormalizedIdentity, TrainedClassifier};
use identx_index::{Embedder, IdentityIndex};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Structured outcome of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub success: bool,
    pub message: String,
    /// Pairs actually used for fitting
    pub pairs: usize,
    /// Fit accuracy on the training set
    pub accuracy: f32,
    pub elapsed_ms: u64,
    /// Short opaque identifier for this run
    pub run_id: String,
}

impl TrainingReport {
    fn failure(message: String, run_id: String, started: Instant) -> Self {
        Self {
            success: false,
            message,
            pairs: 0,
            accuracy: 0.0,
            elapsed_ms: started.elapsed().as_millis() as u64,
            run_id,
        }
    }
}

fn new_run_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Train a classifier from `pairs_path` and persist it at `model_path`.
///
/// The index must contain the candidate rows the pair file references;
/// pairs pointing at unknown candidates are skipped with a warning.
pub fn train(
    pairs_path: &Path,
    index: &IdentityIndex,
    embedder: &dyn Embedder,
    store: &ModelStore,
    model_path: &Path,
) -> Result<TrainingReport> {
    let started = Instant::now();
    let run_id = new_run_id();

    if !pairs_path.exists() {
        return Ok(TrainingReport::failure(
            format!("Training data not found: {}", pairs_path.display()),
            run_id,
            started,
        ));
    }

    let mut rows: Vec<FeatureRow> = Vec::new();
    let mut labels: Vec<u8> = Vec::new();
    let mut skipped = 0usize;

    let mut reader = csv::Reader::from_path(pairs_path)?;
    for pair in reader.deserialize() {
        let pair: TrainingPair = pair?;
        let query = NormalizedIdentity::from_record(&pair.query_record());
        let qvec = embedder.embed(&query.canonical_text());

        let Some(candidate) = index.get(pair.cand_customer_id) else {
            skipped += 1;
            continue;
        };
        let vdist = qvec.l2_distance(&candidate.vector);
        rows.push(feature_row(&query, &candidate.identity, vdist));
        labels.push(pair.label.min(1));
    }
    if skipped > 0 {
        warn!(skipped, "pairs referenced candidates missing from the index");
    }

    if rows.is_empty() {
        return Ok(TrainingReport::failure(
            format!("Training data contains no usable pairs: {}", pairs_path.display()),
            run_id,
            started,
        ));
    }

    let model = TrainedClassifier::fit(&rows, &labels);
    let accuracy = model.accuracy(&rows, &labels);
    store.save(&model, model_path)?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(run_id = %run_id, pairs = rows.len(), accuracy, elapsed_ms, "training run complete");

    Ok(TrainingReport {
        success: true,
        message: format!("Trained on {} pairs, artifact saved to {}", rows.len(), model_path.display()),
        pairs: rows.len(),
        accuracy,
        elapsed_ms,
        run_id,
    })
}

/// [`train`], generating the pair file first when it does not exist yet.
///
/// This is the entry point for callers holding only a raw dataset: the pair
/// file lands at `pairs_path` as a side effect and stays reusable for later
/// runs.
pub fn train_or_generate(
    pairs_path: &Path,
    index: &IdentityIndex,
    embedder: &dyn Embedder,
    store: &ModelStore,
    model_path: &Path,
    gen_config: &PairGenConfig,
) -> Result<TrainingReport> {
    if !pairs_path.exists() {
        let stats = generate_pairs(index, pairs_path, gen_config)?;
        info!(pairs = stats.pairs_written, "generated training pairs before fitting");
    }
    train(pairs_path, index, embedder, store, model_path)
}
