//! Normalization Utilities
//!
//! Soil-type names arrive from three places (the CSV dataset, the classifier
//! label set and form fields) with inconsistent casing and padding. Every
//! table key and every lookup goes through `normalize_key` so they agree.

/// Canonical form of a lookup key: trimmed and lowercased.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Title-case a display name ("red soil" -> "Red Soil").
///
/// A letter is uppercased when it follows a non-letter (or starts the string)
/// and lowercased otherwise, so "sandy loam" and "SANDY LOAM" render the same.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_is_letter = false;

    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }

    out
}
