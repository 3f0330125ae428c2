//! Query/candidate feature extraction
//!
//! Produces the fixed-order numeric feature vector consumed by the
//! classifiers. The order and the sentinel values are part of the classifier
//! contract: changing either invalidates every trained artifact.

use crate::record::NormalizedIdentity;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Number of entries in a [`FeatureRow`].
pub const FEATURE_COUNT: usize = 10;

/// Ordered feature vector:
///
/// 0. vector similarity `1 / (1 + vdist)`
/// 1. Jaro-Winkler similarity of normalized names
/// 2. phone exact-match indicator
/// 3. email exact-match indicator
/// 4. government-id exact-match indicator
/// 5. Jaccard overlap of address-line tokens
/// 6. Jaro-Winkler similarity of city
/// 7. Jaro-Winkler similarity of state
/// 8. postal-code tiered match (1.0 / 0.5 / 0.0)
/// 9. absolute DOB delta in days, 9999.0 when either side is missing
pub type FeatureRow = [f32; FEATURE_COUNT];

/// Sentinel day delta when either date is missing: large enough to disqualify
/// the DOB-proximity signal, never a real delta.
pub const DOB_DELTA_SENTINEL: f32 = 9999.0;

/// Build the feature row for one query/candidate pair.
pub fn feature_row(query: &NormalizedIdentity, candidate: &NormalizedIdentity, vdist: f32) -> FeatureRow {
    let vsim = 1.0 / (1.0 + vdist);
    [
        vsim,
        jw(&query.full_name, &candidate.full_name),
        exact_match(&query.phone_e164, &candidate.phone_e164),
        exact_match(&query.email_norm, &candidate.email_norm),
        exact_match(&query.gov_id_norm, &candidate.gov_id_norm),
        addr_overlap(&query.addr_line, &candidate.addr_line),
        jw(&query.city, &candidate.city),
        jw(&query.state, &candidate.state),
        pincode_match(&query.postal_code, &candidate.postal_code),
        dob_delta_days(&query.dob, &candidate.dob),
    ]
}

/// Jaro-Winkler similarity in [0, 1]; empty on either side scores 0.
pub fn jw(a: &str, b: &str) -> f32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(&a, &b) as f32
}

/// 1.0 when both sides are non-empty and equal, 0.0 otherwise.
fn exact_match(a: &str, b: &str) -> f32 {
    if !a.is_empty() && a == b {
        1.0
    } else {
        0.0
    }
}

/// Jaccard overlap of whitespace tokens; 0 when either side has no tokens.
pub fn addr_overlap(a: &str, b: &str) -> f32 {
    let tokens_a: HashSet<String> = a.split_whitespace().map(|t| t.to_lowercase()).collect();
    let tokens_b: HashSet<String> = b.split_whitespace().map(|t| t.to_lowercase()).collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f32 / union as f32
}

/// Tiered postal-code match: exact gives 1.0, a shared 5-digit prefix on two
/// 6-character codes gives 0.5, anything else 0.0.
pub fn pincode_match(a: &str, b: &str) -> f32 {
    let a = a.trim();
    let b = b.trim();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.len() == 6 && b.len() == 6 && a.as_bytes()[..5] == b.as_bytes()[..5] {
        return 0.5;
    }
    0.0
}

/// Absolute difference in days between two ISO dates.
///
/// Missing or unparseable dates yield [`DOB_DELTA_SENTINEL`].
pub fn dob_delta_days(a: &str, b: &str) -> f32 {
    let parse = |s: &str| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok();
    match (parse(a), parse(b)) {
        (Some(da), Some(db)) => (da - db).num_days().abs() as f32,
        _ => DOB_DELTA_SENTINEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::IdentityRecord;

    fn identity(name: &str, phone: &str, pc: &str, dob: &str) -> NormalizedIdentity {
        NormalizedIdentity::from_record(&IdentityRecord {
            full_name: Some(name.to_string()),
            dob: if dob.is_empty() { None } else { Some(dob.to_string()) },
            phone: Some(phone.to_string()),
            email: Some("a@example.com".to_string()),
            gov_id: Some("X1".to_string()),
            addr_line: Some("12 MG Road".to_string()),
            city: Some("Bengaluru".to_string()),
            state: Some("Karnataka".to_string()),
            postal_code: Some(pc.to_string()),
            country: None,
        })
    }

    #[test]
    fn test_feature_row_has_fixed_order() {
        let q = identity("Anita Sharma", "+919876543210", "560001", "1990-01-01");
        let c = identity("Anita Sharma", "+919876543210", "560001", "1990-01-01");
        let row = feature_row(&q, &c, 0.0);

        assert_eq!(row.len(), FEATURE_COUNT);
        assert_eq!(row[0], 1.0); // vdist 0 -> vsim 1
        assert!(row[1] > 0.99); // identical names
        assert_eq!(row[2], 1.0);
        assert_eq!(row[3], 1.0);
        assert_eq!(row[4], 1.0);
        assert_eq!(row[5], 1.0);
        assert_eq!(row[8], 1.0);
        assert_eq!(row[9], 0.0);
    }

    #[test]
    fn test_vsim_is_monotone_in_distance() {
        let q = identity("A", "1", "", "");
        let near = feature_row(&q, &q, 0.1)[0];
        let far = feature_row(&q, &q, 0.9)[0];
        assert!(near > far);
    }

    #[test]
    fn test_jw_empty_sides() {
        assert_eq!(jw("", "anita"), 0.0);
        assert_eq!(jw("anita", ""), 0.0);
        assert!(jw("anita sharma", "anita sarma") > 0.8);
    }

    #[test]
    fn test_exact_match_ignores_empty() {
        assert_eq!(exact_match("", ""), 0.0);
        assert_eq!(exact_match("+91", "+91"), 1.0);
        assert_eq!(exact_match("+91", "+92"), 0.0);
    }

    #[test]
    fn test_addr_overlap() {
        assert_eq!(addr_overlap("12 mg road", "12 mg road"), 1.0);
        assert_eq!(addr_overlap("", "12 mg road"), 0.0);
        let half = addr_overlap("12 mg road", "14 mg road");
        assert!((half - 0.5).abs() < 1e-6); // {mg, road} of {12, 14, mg, road}
    }

    #[test]
    fn test_pincode_match_tiers() {
        assert_eq!(pincode_match("560001", "560001"), 1.0);
        assert_eq!(pincode_match("560001", "560002"), 0.5);
        assert_eq!(pincode_match("560001", "560101"), 0.0);
        assert_eq!(pincode_match("", "560001"), 0.0);
    }

    #[test]
    fn test_dob_delta_days() {
        assert_eq!(dob_delta_days("", "1990-01-03"), DOB_DELTA_SENTINEL);
        assert_eq!(dob_delta_days("1990-01-01", "1990-01-03"), 2.0);
        assert_eq!(dob_delta_days("1990-01-03", "1990-01-01"), 2.0);
        assert_eq!(dob_delta_days("not-a-date", "1990-01-01"), DOB_DELTA_SENTINEL);
    }
}
