//! Per-field identity normalization
//!
//! Pure, total functions: absent or invalid input maps to an empty
//! normalized value, never an error. The outputs feed both the canonical
//! identity text (see [`crate::record`]) and the feature extractor, so any
//! change here invalidates trained classifier artifacts.

use regex::Regex;
use std::sync::OnceLock;

/// Lowercase a name and strip everything that is not a letter.
///
/// Non-letter characters become spaces and runs of whitespace collapse to a
/// single space.
pub fn norm_name(s: &str) -> String {
    let lowered = s.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and apply provider-specific canonicalization.
///
/// Gmail-family addresses ignore dots in the local part and anything after a
/// plus sign. Other providers are only trimmed and lowercased.
pub fn norm_email(s: &str) -> String {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return s;
    }
    match s.split_once('@') {
        Some((local, domain)) if domain == "gmail.com" || domain == "googlemail.com" => {
            let local = local.split('+').next().unwrap_or("").replace('.', "");
            format!("{local}@{domain}")
        }
        _ => s,
    }
}

/// Best-effort E.164 phone formatting.
///
/// Strips non-digits and adds a leading `+` when the number appears to carry
/// a country code. Only the Indian `91` prefix is recognized explicitly; this
/// is deliberately conservative, not authoritative E.164.
pub fn norm_phone(s: &str) -> String {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.starts_with("91") && digits.len() == 12 {
        return format!("+{digits}");
    }
    if digits.len() >= 10 {
        return format!("+{digits}");
    }
    digits
}

/// Trim and uppercase a government identifier.
pub fn norm_gov_id(s: &str) -> String {
    s.trim().to_uppercase()
}

fn pin_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[1-9]\d{5}$").expect("postal code regex"))
}

/// Return a valid 6-digit postal code or an empty string.
///
/// Whitespace is stripped first; the result must be six digits with a
/// non-zero leading digit. Anything else is treated as missing, never a
/// partially valid value.
pub fn norm_postal_code(s: &str) -> String {
    let stripped: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if pin_re().is_match(&stripped) {
        stripped
    } else {
        String::new()
    }
}
