//! Labeled training-pair mining
//!
//! Clusters stored identities by canonical text (string equality is the
//! exact-duplicate definition), emits positive pairs inside each cluster and
//! mines one hard negative per query: the nearest identity by vector
//! distance that is not a member of the query's own cluster.
//!
//! Mining is independent per query, so it fans out across the rayon pool;
//! the CSV sink is a single writer that flushes in bounded chunks, keeping
//! memory flat regardless of dataset size and the output order deterministic.

use crate::error::{Error, Result};
use ahash::{AHashMap, AHashSet};
use identx_core::{IdentityRecord, NormalizedIdentity};
use identx_index::{mine_hard_negative, IdentityIndex, StoredIdentity};
use rand::seq::IndexedRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Pair-mining tunables.
#[derive(Debug, Clone)]
pub struct PairGenConfig {
    /// Positive pairs emitted per query row; larger clusters are sampled
    /// uniformly down to this cap, not truncated front-first
    pub max_pos_per_query: usize,
    /// Pairs buffered between flushes of the output writer
    pub chunk_size: usize,
    /// Neighbors fetched when mining a hard negative through the retrieval
    /// contract before falling back to a full scan
    pub hard_negative_k: usize,
}

impl Default for PairGenConfig {
    fn default() -> Self {
        Self {
            max_pos_per_query: 5,
            chunk_size: 10_000,
            hard_negative_k: 20,
        }
    }
}

/// One labeled query/candidate pair, the flat tabular interchange format
/// between pair generation and training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub query_full_name: String,
    pub query_dob: String,
    pub query_phone: String,
    pub query_email: String,
    pub query_gov_id: String,
    pub query_addr: String,
    pub query_city: String,
    pub query_state: String,
    pub query_pc: String,
    pub query_ctry: String,
    pub cand_customer_id: u64,
    /// 1 for a true duplicate, 0 for a hard negative
    pub label: u8,
}

impl TrainingPair {
    fn new(query: &NormalizedIdentity, cand_customer_id: u64, label: u8) -> Self {
        Self {
            query_full_name: query.full_name.clone(),
            query_dob: query.dob.clone(),
            query_phone: query.phone_e164.clone(),
            query_email: query.email_norm.clone(),
            query_gov_id: query.gov_id_norm.clone(),
            query_addr: query.addr_line.clone(),
            query_city: query.city.clone(),
            query_state: query.state.clone(),
            query_pc: query.postal_code.clone(),
            query_ctry: query.country.clone(),
            cand_customer_id,
            label,
        }
    }

    /// Rebuild the query side as a raw record. Normalization is idempotent,
    /// so re-normalizing these already-normalized values reproduces the
    /// original canonical text byte for byte.
    pub fn query_record(&self) -> IdentityRecord {
        IdentityRecord {
            full_name: Some(self.query_full_name.clone()),
            dob: Some(self.query_dob.clone()),
            phone: Some(self.query_phone.clone()),
            email: Some(self.query_email.clone()),
            gov_id: Some(self.query_gov_id.clone()),
            addr_line: Some(self.query_addr.clone()),
            city: Some(self.query_city.clone()),
            state: Some(self.query_state.clone()),
            postal_code: Some(self.query_pc.clone()),
            country: Some(self.query_ctry.clone()),
        }
    }
}

/// Counters from one generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairGenStats {
    pub clusters: usize,
    pub queries: usize,
    pub positives: usize,
    pub negatives: usize,
    pub pairs_written: usize,
}

/// One query row's mining work: emit positives against its cluster siblings
/// and find a hard negative outside the cluster.
struct QueryTask {
    query_idx: usize,
    siblings: Vec<usize>,
    cluster_ids: Arc<AHashSet<u64>>,
}

/// Mine labeled pairs from the index and write them to a CSV file.
///
/// Duplicate clusters are groups of identical canonical text; singleton
/// groups produce no pairs. Output row order is deterministic for a given
/// dataset order (randomness only affects which positives a large cluster
/// contributes, not their position).
pub fn generate_pairs(
    index: &IdentityIndex,
    output: &Path,
    config: &PairGenConfig,
) -> Result<PairGenStats> {
    if output.extension().and_then(|e| e.to_str()) != Some("csv") {
        return Err(Error::UnsupportedFormat(output.to_path_buf()));
    }

    let snapshot = index.snapshot();
    let clusters = cluster_by_canonical_text(&snapshot);
    let mut stats = PairGenStats {
        clusters: clusters.iter().filter(|c| c.len() >= 2).count(),
        ..Default::default()
    };

    let mut tasks = Vec::new();
    for cluster in &clusters {
        if cluster.len() < 2 {
            continue;
        }
        let cluster_ids: Arc<AHashSet<u64>> = Arc::new(
            cluster
                .iter()
                .map(|&i| snapshot[i].customer_id)
                .collect(),
        );
        for &query_idx in cluster {
            tasks.push(QueryTask {
                query_idx,
                siblings: cluster.iter().copied().filter(|&i| i != query_idx).collect(),
                cluster_ids: cluster_ids.clone(),
            });
        }
    }
    stats.queries = tasks.len();
    debug!(clusters = stats.clusters, queries = stats.queries, "clustered dataset");

    let mut writer = csv::Writer::from_path(output)?;
    // Size task batches so each flush carries roughly chunk_size pairs
    let pairs_per_query = config.max_pos_per_query + 1;
    let tasks_per_batch = (config.chunk_size / pairs_per_query).max(1);

    for batch in tasks.chunks(tasks_per_batch) {
        let mined: Vec<Vec<TrainingPair>> = batch
            .par_iter()
            .map(|task| mine_query(&snapshot, index, task, config))
            .collect::<Result<Vec<_>>>()?;

        // Single-writer sink: pair emission is serialized per batch
        for pairs in mined {
            for pair in pairs {
                if pair.label == 1 {
                    stats.positives += 1;
                } else {
                    stats.negatives += 1;
                }
                writer.serialize(&pair)?;
                stats.pairs_written += 1;
            }
        }
        writer.flush()?;
    }

    info!(
        pairs = stats.pairs_written,
        positives = stats.positives,
        negatives = stats.negatives,
        output = %output.display(),
        "wrote training pairs"
    );
    Ok(stats)
}

/// Group row indices by canonical text, preserving first-seen order so the
/// output is stable across runs.
fn cluster_by_canonical_text(snapshot: &[StoredIdentity]) -> Vec<Vec<usize>> {
    let mut position: AHashMap<&str, usize> = AHashMap::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for (i, row) in snapshot.iter().enumerate() {
        match position.get(row.canonical_text.as_str()) {
            Some(&p) => clusters[p].push(i),
            None => {
                position.insert(&row.canonical_text, clusters.len());
                clusters.push(vec![i]);
            }
        }
    }
    clusters
}

fn mine_query(
    snapshot: &[StoredIdentity],
    index: &IdentityIndex,
    task: &QueryTask,
    config: &PairGenConfig,
) -> Result<Vec<TrainingPair>> {
    let query = &snapshot[task.query_idx];
    let mut pairs = Vec::with_capacity(config.max_pos_per_query + 1);

    // Positives: cluster siblings, uniformly sampled when over the cap
    let mut chosen: Vec<usize> = if task.siblings.len() > config.max_pos_per_query {
        let mut rng = rand::rng();
        task.siblings
            .choose_multiple(&mut rng, config.max_pos_per_query)
            .copied()
            .collect()
    } else {
        task.siblings.clone()
    };
    chosen.sort_unstable();
    for sibling_idx in chosen {
        pairs.push(TrainingPair::new(
            &query.identity,
            snapshot[sibling_idx].customer_id,
            1,
        ));
    }

    // Hard negative: nearest non-member, first through the retrieval
    // contract, then a full scan of the precomputed vector table when the
    // top-k neighborhood is all cluster members
    let negative = match mine_hard_negative(
        index,
        &query.vector,
        &task.cluster_ids,
        config.hard_negative_k,
    )? {
        Some(id) => Some(id),
        None => nearest_non_member(snapshot, query, &task.cluster_ids),
    };
    if let Some(neg_id) = negative {
        pairs.push(TrainingPair::new(&query.identity, neg_id, 0));
    }

    Ok(pairs)
}

/// Brute-force nearest neighbor over the precomputed vectors, excluding the
/// query's own cluster.
fn nearest_non_member(
    snapshot: &[StoredIdentity],
    query: &StoredIdentity,
    exclude: &AHashSet<u64>,
) -> Option<u64> {
    snapshot
        .iter()
        .filter(|row| !exclude.contains(&row.customer_id))
        .map(|row| (row.customer_id, row.vector.l2_distance(&query.vector)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use identx_index::{Embedder, FixedDimEmbedder, HashingEmbedder};

    const DIM: usize = 128;

    fn record(name: &str, phone: &str) -> IdentityRecord {
        IdentityRecord {
            full_name: Some(name.to_string()),
            dob: Some("1990-01-01".to_string()),
            phone: Some(phone.to_string()),
            email: Some(format!("{}@example.com", name.replace(' ', "."))),
            city: Some("Bengaluru".to_string()),
            ..Default::default()
        }
    }

    /// Build an index where ids 1..=n share one canonical text and the rest
    /// are distinct singletons.
    fn index_with_cluster(cluster_size: u64, singletons: u64) -> IdentityIndex {
        let embedder = FixedDimEmbedder::new(HashingEmbedder::new(64), DIM);
        let index = IdentityIndex::new(DIM);
        for id in 1..=cluster_size {
            let identity = NormalizedIdentity::from_record(&record("Anita Sharma", "+919876543210"));
            let vector = embedder.embed(&identity.canonical_text());
            index
                .insert(StoredIdentity::new(id, identity, vector))
                .unwrap();
        }
        for i in 0..singletons {
            let id = cluster_size + 1 + i;
            let identity =
                NormalizedIdentity::from_record(&record(&format!("Person {id}"), &format!("+9198000000{id:02}")));
            let vector = embedder.embed(&identity.canonical_text());
            index
                .insert(StoredIdentity::new(id, identity, vector))
                .unwrap();
        }
        index
    }

    fn read_pairs(path: &Path) -> Vec<TrainingPair> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.deserialize().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_singleton_clusters_produce_no_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pairs.csv");
        let index = index_with_cluster(1, 4);

        let stats = generate_pairs(&index, &out, &PairGenConfig::default()).unwrap();
        assert_eq!(stats.pairs_written, 0);
        assert_eq!(stats.clusters, 0);
        assert!(read_pairs(&out).is_empty());
    }

    #[test]
    fn test_cluster_emits_positives_and_hard_negatives() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pairs.csv");
        let index = index_with_cluster(3, 2);

        let stats = generate_pairs(&index, &out, &PairGenConfig::default()).unwrap();
        // 3 queries, each with 2 positives and 1 negative
        assert_eq!(stats.queries, 3);
        assert_eq!(stats.positives, 6);
        assert_eq!(stats.negatives, 3);

        let cluster_ids: AHashSet<u64> = [1, 2, 3].into_iter().collect();
        for pair in read_pairs(&out) {
            if pair.label == 1 {
                assert!(cluster_ids.contains(&pair.cand_customer_id));
            } else {
                // The hard negative is never a member of the query's cluster
                assert!(!cluster_ids.contains(&pair.cand_customer_id));
            }
        }
    }

    #[test]
    fn test_positives_capped_by_uniform_sample() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pairs.csv");
        let index = index_with_cluster(9, 1);

        let config = PairGenConfig {
            max_pos_per_query: 3,
            ..Default::default()
        };
        let stats = generate_pairs(&index, &out, &config).unwrap();
        // min(n - 1, cap) positives per query
        assert_eq!(stats.positives, 9 * 3);
        assert_eq!(stats.negatives, 9);

        for pair in read_pairs(&out) {
            if pair.label == 1 {
                assert!((1..=9).contains(&pair.cand_customer_id));
            } else {
                assert_eq!(pair.cand_customer_id, 10);
            }
        }
    }

    #[test]
    fn test_no_negative_when_everything_is_one_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pairs.csv");
        let index = index_with_cluster(3, 0);

        let stats = generate_pairs(&index, &out, &PairGenConfig::default()).unwrap();
        assert_eq!(stats.negatives, 0);
        assert_eq!(stats.positives, 6);
    }

    #[test]
    fn test_small_chunk_size_still_writes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pairs.csv");
        let index = index_with_cluster(4, 3);

        let config = PairGenConfig {
            chunk_size: 2,
            ..Default::default()
        };
        let stats = generate_pairs(&index, &out, &config).unwrap();
        assert_eq!(stats.pairs_written, read_pairs(&out).len());
        assert_eq!(stats.positives, 4 * 3);
        assert_eq!(stats.negatives, 4);
    }

    #[test]
    fn test_rejects_non_csv_output() {
        let index = index_with_cluster(2, 0);
        let err =
            generate_pairs(&index, Path::new("pairs.parquet"), &PairGenConfig::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_query_record_roundtrips_canonical_text() {
        let identity = NormalizedIdentity::from_record(&record("Anita K. Sharma", "+919876543210"));
        let pair = TrainingPair::new(&identity, 42, 1);
        let rebuilt = NormalizedIdentity::from_record(&pair.query_record());
        assert_eq!(identity.canonical_text(), rebuilt.canonical_text());
    }
}
