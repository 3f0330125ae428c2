//! Deduplication orchestrator
//!
//! Composes normalization, canonicalization, embedding, candidate retrieval,
//! feature extraction and classification into a single `check` operation.
//! This is the only entry point an outer transport layer needs.

use crate::cancel::CancelToken;
use crate::config::DedupeConfig;
use crate::error::{Error, Result};
use identx_core::features::feature_row;
use identx_core::{CandidateMatch, Classifier, DuplicateDecision, IdentityRecord, ModelStore, NormalizedIdentity};
use identx_index::{CandidateRetriever, Embedder};
use std::sync::Arc;
use tracing::{debug, instrument};

/// The identity-resolution pipeline: one `check` per incoming record.
///
/// Holds no per-request state; concurrent checks only share the read-mostly
/// classifier cache and the retriever, both of which are per-call isolated.
pub struct Deduper {
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn CandidateRetriever>,
    store: Arc<ModelStore>,
    config: DedupeConfig,
}

impl Deduper {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: Arc<dyn CandidateRetriever>,
        store: Arc<ModelStore>,
        config: DedupeConfig,
    ) -> Self {
        Self {
            embedder,
            retriever,
            store,
            config,
        }
    }

    pub fn config(&self) -> &DedupeConfig {
        &self.config
    }

    /// Resolve whether `record` refers to an already-stored identity.
    #[instrument(skip_all)]
    pub fn check(&self, record: &IdentityRecord) -> Result<DuplicateDecision> {
        self.check_cancellable(record, &CancelToken::new())
    }

    /// [`Deduper::check`] with cooperative cancellation. The token is polled
    /// before and after retrieval, the dominant cost.
    pub fn check_cancellable(
        &self,
        record: &IdentityRecord,
        cancel: &CancelToken,
    ) -> Result<DuplicateDecision> {
        let query = NormalizedIdentity::from_record(record);
        let canonical = query.canonical_text();

        let qvec = self.embedder.embed(&canonical);
        if qvec.dim() != self.config.vector_dim {
            return Err(Error::InvalidDimension {
                expected: self.config.vector_dim,
                actual: qvec.dim(),
            });
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let retrieved = self.retriever.top_k(&qvec, self.config.top_k)?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if retrieved.is_empty() {
            debug!("retrieval returned no candidates");
            return Ok(DuplicateDecision::no_match(self.config.threshold));
        }

        let rows: Vec<_> = retrieved
            .iter()
            .map(|hit| feature_row(&query, &hit.identity, hit.vdist))
            .collect();

        let model = self.store.load(&self.config.model_path)?;
        let probs = model.predict(&rows);

        let mut candidates: Vec<CandidateMatch> = retrieved
            .into_iter()
            .zip(probs)
            .map(|(hit, score)| CandidateMatch {
                customer_id: hit.customer_id,
                identity: hit.identity,
                vdist: hit.vdist,
                score,
            })
            .collect();

        // Stable sort: equal scores keep retrieval (distance) order
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let best = candidates[0].clone();
        candidates.truncate(self.config.max_evidence);
        debug!(
            best_id = best.customer_id,
            best_score = best.score,
            trained = model.is_trained(),
            "scored candidates"
        );

        Ok(DuplicateDecision {
            is_duplicate: best.score >= self.config.threshold,
            score: best.score,
            threshold: self.config.threshold,
            best_match: Some(best),
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use identx_index::{FixedDimEmbedder, HashingEmbedder, IdentityIndex, StoredIdentity, Vector};

    const DIM: usize = 128;

    fn record(name: &str, phone: &str, gov_id: &str) -> IdentityRecord {
        IdentityRecord {
            full_name: Some(name.to_string()),
            dob: Some("1990-01-01".to_string()),
            phone: Some(phone.to_string()),
            email: Some(format!("{}@example.com", name.replace(' ', "."))),
            gov_id: Some(gov_id.to_string()),
            addr_line: Some("12 MG Road".to_string()),
            city: Some("Bengaluru".to_string()),
            state: Some("Karnataka".to_string()),
            postal_code: Some("560001".to_string()),
            country: Some("IN".to_string()),
        }
    }

    fn build_deduper(records: &[(u64, IdentityRecord)]) -> Deduper {
        let embedder = Arc::new(FixedDimEmbedder::new(HashingEmbedder::new(64), DIM));
        let index = Arc::new(IdentityIndex::new(DIM));
        for (id, r) in records {
            let identity = NormalizedIdentity::from_record(r);
            let vector = embedder.embed(&identity.canonical_text());
            index
                .insert(StoredIdentity::new(*id, identity, vector))
                .unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let config = DedupeConfig {
            vector_dim: DIM,
            model_path: dir.path().join("absent.bin"),
            ..Default::default()
        };
        Deduper::new(embedder, index, Arc::new(ModelStore::new()), config)
    }

    #[test]
    fn test_exact_duplicate_is_flagged() {
        let deduper = build_deduper(&[
            (1, record("Anita Sharma", "+919876543210", "AAA")),
            (2, record("Rahul Verma", "+919812345678", "BBB")),
        ]);
        let decision = deduper.check(&record("Anita Sharma", "+919876543210", "AAA")).unwrap();
        assert!(decision.is_duplicate);
        assert_eq!(decision.best_match.as_ref().unwrap().customer_id, 1);
        assert!(decision.score >= decision.threshold);
    }

    #[test]
    fn test_unrelated_record_is_not_flagged() {
        let deduper = build_deduper(&[(1, record("Anita Sharma", "+919876543210", "AAA"))]);
        let mut stranger = record("Zed Unrelated", "+911111111111", "ZZZ");
        stranger.dob = Some("1971-07-07".to_string());
        stranger.email = Some("zed@other.org".to_string());
        stranger.addr_line = Some("9 Nowhere Lane".to_string());
        stranger.city = Some("Pune".to_string());
        stranger.postal_code = Some("411001".to_string());

        let decision = deduper.check(&stranger).unwrap();
        assert!(!decision.is_duplicate);
        assert_eq!(decision.is_duplicate, decision.score >= decision.threshold);
    }

    #[test]
    fn test_empty_index_yields_non_duplicate() {
        let deduper = build_deduper(&[]);
        let decision = deduper.check(&record("Anyone", "+919876543210", "AAA")).unwrap();
        assert!(!decision.is_duplicate);
        assert_eq!(decision.score, 0.0);
        assert!(decision.candidates.is_empty());
        assert!(decision.best_match.is_none());
    }

    #[test]
    fn test_candidates_sorted_descending_and_capped() {
        let records: Vec<(u64, IdentityRecord)> = (0..15)
            .map(|i| {
                (
                    i,
                    record(
                        &format!("Person Number{i}"),
                        &format!("+91987654{i:04}"),
                        &format!("ID{i}"),
                    ),
                )
            })
            .collect();
        let deduper = build_deduper(&records);

        let decision = deduper.check(&record("Person Number3", "+919876540003", "ID3")).unwrap();
        assert!(decision.candidates.len() <= 10);
        for pair in decision.candidates.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(
            decision.score,
            decision.candidates[0].score,
        );
    }

    #[test]
    fn test_tied_scores_keep_retrieval_order() {
        // A shared gov id short-circuits every candidate to the same 0.99,
        // so the descending sort sees nothing but ties; the stable sort must
        // keep them in retrieval order, ascending by distance.
        let records: Vec<(u64, IdentityRecord)> = (0..6)
            .map(|i| {
                let mut r = record(
                    &format!("Person Number{i}"),
                    &format!("+91987654{i:04}"),
                    "SHARED1",
                );
                r.city = Some(format!("City{i}"));
                (i + 1, r)
            })
            .collect();
        let deduper = build_deduper(&records);

        let decision = deduper
            .check(&record("Person Number0", "+919876540000", "SHARED1"))
            .unwrap();
        assert!(decision.candidates.len() >= 2);
        for pair in decision.candidates.windows(2) {
            assert_eq!(pair[0].score, pair[1].score);
            assert!(pair[0].vdist <= pair[1].vdist);
        }
    }

    #[test]
    fn test_dimension_mismatch_is_hard_failure() {
        let embedder = Arc::new(HashingEmbedder::new(64)); // native dim, no adapter
        let index = Arc::new(IdentityIndex::new(DIM));
        let config = DedupeConfig {
            vector_dim: DIM,
            ..Default::default()
        };
        let deduper = Deduper::new(embedder, index, Arc::new(ModelStore::new()), config);

        let err = deduper.check(&record("Anita Sharma", "+919876543210", "AAA")).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { expected: DIM, actual: 64 }));
    }

    #[test]
    fn test_cancelled_token_aborts_check() {
        let deduper = build_deduper(&[(1, record("Anita Sharma", "+919876543210", "AAA"))]);
        let token = CancelToken::new();
        token.cancel();
        let err = deduper
            .check_cancellable(&record("Anita Sharma", "+919876543210", "AAA"), &token)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_gov_id_match_alone_flags_duplicate() {
        // Same gov id, everything else different: the rule-based fallback
        // scores it 0.99, above any sane threshold.
        let deduper = build_deduper(&[(1, record("Anita Sharma", "+919876543210", "SHARED1"))]);
        let mut probe = record("Different Name", "+912222222222", "SHARED1");
        probe.email = Some("other@other.org".to_string());
        probe.dob = Some("1980-05-05".to_string());

        let decision = deduper.check(&probe).unwrap();
        assert!(decision.is_duplicate);
        assert!(decision.score >= 0.99);
    }

    #[test]
    fn test_vector_is_unit_normalized_before_search() {
        // The embedder contract says unit vectors; sanity-check the wiring.
        let embedder = FixedDimEmbedder::new(HashingEmbedder::new(64), DIM);
        let v: Vector = embedder.embed("name:x | dob: | phone:");
        assert!((v.norm() - 1.0).abs() < 0.01);
    }
}
