//! Column resolution helpers with validation
//!
//! Dataset headers are hand-edited spreadsheets ("Humidity ", "Soil Type")
//! so columns are matched by normalized name rather than verbatim.

use anyhow::{anyhow, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;

use super::normalization::normalize_key;

/// Map each normalized header name to the column name as it appears in `df`.
///
/// When two headers normalize to the same key the first one wins.
pub fn normalized_column_names(df: &DataFrame) -> FxHashMap<String, String> {
    let mut names = FxHashMap::default();
    for name in df.get_column_names() {
        let actual = name.to_string();
        names.entry(normalize_key(&actual)).or_insert(actual);
    }
    names
}

/// Resolve the actual column name for a normalized key, trying `candidates` in order.
///
/// # Errors
/// Returns an error naming the first candidate and listing the available
/// (normalized) columns when none of the candidates is present.
pub fn resolve_column<'a>(
    names: &'a FxHashMap<String, String>,
    candidates: &[&str],
    context: &str,
) -> Result<&'a str> {
    for candidate in candidates {
        if let Some(actual) = names.get(*candidate) {
            return Ok(actual.as_str());
        }
    }

    let mut available: Vec<&str> = names.keys().map(|s| s.as_str()).collect();
    available.sort_unstable();
    Err(anyhow!(
        "{}: Missing expected column '{}'. Available columns: {:?}",
        context,
        candidates.first().copied().unwrap_or_default(),
        available
    ))
}
