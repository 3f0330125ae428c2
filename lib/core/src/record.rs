//! Identity data model
//!
//! [`IdentityRecord`] is the raw, caller-supplied shape with no invariants.
//! [`NormalizedIdentity`] holds one normalized value per attribute and can
//! render itself as canonical identity text, which doubles as the embedding
//! input and the exact-duplicate cluster key. Two raw records that normalize
//! to the same canonical text are by definition the same cluster, so the
//! field order and formatting below must stay byte-identical between the
//! online check path and the offline training path.

use crate::normalize::{norm_email, norm_gov_id, norm_name, norm_phone, norm_postal_code};
use serde::{Deserialize, Serialize};

/// Raw identity attributes as supplied by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub full_name: Option<String>,
    /// ISO `yyyy-mm-dd` date of birth
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

/// One normalized value per identity attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIdentity {
    pub full_name: String,
    pub dob: String,
    pub phone_e164: String,
    pub email_norm: String,
    pub gov_id_norm: String,
    pub addr_line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl NormalizedIdentity {
    /// Normalize a raw record. Total: missing fields become empty values,
    /// except `country` which defaults to `IN`.
    pub fn from_record(record: &IdentityRecord) -> Self {
        fn get(f: &Option<String>) -> &str {
            f.as_deref().unwrap_or("")
        }
        Self {
            full_name: norm_name(get(&record.full_name)),
            dob: get(&record.dob).trim().to_string(),
            phone_e164: norm_phone(get(&record.phone)),
            email_norm: norm_email(get(&record.email)),
            gov_id_norm: norm_gov_id(get(&record.gov_id)),
            addr_line: get(&record.addr_line).to_lowercase(),
            city: get(&record.city).to_lowercase(),
            state: get(&record.state).to_lowercase(),
            postal_code: norm_postal_code(get(&record.postal_code)),
            country: record
                .country
                .as_deref()
                .unwrap_or("IN")
                .trim()
                .to_uppercase(),
        }
    }

    /// Deterministic canonical identity text.
    ///
    /// Labeled, pipe-separated segments in fixed field order. Identical
    /// normalized identities always render byte-identical text.
    pub fn canonical_text(&self) -> String {
        format!(
            "name:{} | dob:{} | phone:{} | email:{} | govid:{} | addr:{} | city:{} | state:{} | pc:{} | ctry:{}",
            self.full_name,
            self.dob,
            self.phone_e164,
            self.email_norm,
            self.gov_id_norm,
            self.addr_line,
            self.city,
            self.state,
            self.postal_code,
            self.country,
        )
    }
}

/// A stored identity scored against one query. Transient: owned by a single
/// check call and returned as decision evidence, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub customer_id: u64,
    pub identity: NormalizedIdentity,
    /// Vector distance to the query, ascending from the retriever
    pub vdist: f32,
    /// Duplicate probability in [0, 1]
    pub score: f32,
}

/// Outcome of one duplicate check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateDecision {
    pub is_duplicate: bool,
    /// Score of the best candidate, 0.0 when retrieval was empty
    pub score: f32,
    pub threshold: f32,
    pub best_match: Option<CandidateMatch>,
    /// Top candidates as evidence, sorted descending by score, at most 10
    pub candidates: Vec<CandidateMatch>,
}

impl DuplicateDecision {
    /// Decision for an empty retrieval result: not a duplicate, no evidence.
    pub fn no_match(threshold: f32) -> Self {
        Self {
            is_duplicate: false,
            score: 0.0,
            threshold,
            best_match: None,
            candidates: Vec::new(),
        }
    }
}
