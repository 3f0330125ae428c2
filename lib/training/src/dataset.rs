//! Raw identity datasets
//!
//! Loads tabular identity data for the offline pipeline and turns it into an
//! in-memory [`IdentityIndex`]. Embeddings computed while building the index
//! can be reused across runs through the [`EmbeddingCache`].

use crate::cache::EmbeddingCache;
use crate::error::{Error, Result};
use identx_core::{IdentityRecord, NormalizedIdentity};
use identx_index::{Embedder, IdentityIndex, StoredIdentity};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One row of a raw identity dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIdentityRow {
    pub customer_id: u64,
    pub full_name: Option<String>,
    pub dob: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gov_id: Option<String>,
    pub addr_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl RawIdentityRow {
    pub fn to_record(&self) -> IdentityRecord {
        IdentityRecord {
            full_name: self.full_name.clone(),
            dob: self.dob.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            gov_id: self.gov_id.clone(),
            addr_line: self.addr_line.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }
}

/// Load identity rows from a CSV file. Only `.csv` is supported; other
/// extensions are rejected rather than guessed at.
pub fn load_identities(path: &Path) -> Result<Vec<RawIdentityRow>> {
    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
        return Err(Error::UnsupportedFormat(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<RawIdentityRow>, _>>()?;
    info!(rows = rows.len(), path = %path.display(), "loaded identity dataset");
    Ok(rows)
}

/// Embed every row's canonical text and build an in-memory index.
///
/// When a cache is supplied the embeddings are keyed by the dataset's
/// canonical texts, so rerunning the offline pipeline over an unchanged
/// dataset skips re-embedding entirely.
pub fn build_index(
    rows: &[RawIdentityRow],
    embedder: &dyn Embedder,
    cache: Option<&EmbeddingCache>,
) -> Result<IdentityIndex> {
    let identities: Vec<NormalizedIdentity> = rows
        .iter()
        .map(|row| NormalizedIdentity::from_record(&row.to_record()))
        .collect();
    let texts: Vec<String> = identities.iter().map(|n| n.canonical_text()).collect();

    let vectors = match cache {
        Some(cache) => cache.get_or_compute(&texts, embedder)?,
        None => embedder.embed_batch(&texts),
    };

    let index = IdentityIndex::new(embedder.dim());
    for ((row, identity), vector) in rows.iter().zip(identities).zip(vectors) {
        index.insert(StoredIdentity::new(row.customer_id, identity, vector))?;
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use identx_index::{FixedDimEmbedder, HashingEmbedder};
    use std::io::Write;

    pub(crate) const HEADER: &str =
        "customer_id,full_name,dob,phone,email,gov_id,addr_line,city,state,postal_code,country";

    fn write_dataset(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("customers.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{HEADER}").unwrap();
        writeln!(
            f,
            "1,Anita Sharma,1990-01-01,+919876543210,anita@gmail.com,AAA,12 MG Road,Bengaluru,Karnataka,560001,IN"
        )
        .unwrap();
        writeln!(f, "2,Rahul Verma,,,,,,,,,").unwrap();
        path
    }

    #[test]
    fn test_load_identities_handles_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(dir.path());
        let rows = load_identities(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].customer_id, 1);
        assert_eq!(rows[1].full_name.as_deref(), Some("Rahul Verma"));
        assert!(rows[1].dob.is_none());
    }

    #[test]
    fn test_load_identities_rejects_other_extensions() {
        let err = load_identities(Path::new("customers.parquet")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_build_index_embeds_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(dir.path());
        let rows = load_identities(&path).unwrap();
        let embedder = FixedDimEmbedder::new(HashingEmbedder::new(64), 128);

        let index = build_index(&rows, &embedder, None).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.dim(), 128);
        assert!(index.get(1).is_some());
        assert_eq!(
            index.get(1).unwrap().identity.full_name,
            "anita sharma"
        );
    }
}
