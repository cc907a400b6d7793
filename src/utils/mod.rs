//! Utility modules shared by the data loader and the handlers
//!
//! - Normalization: soil-type keys and display names
//! - Columns: header resolution for hand-edited CSV files

pub mod normalization;
pub mod columns;

// Re-export commonly used helpers
pub use normalization::{normalize_key, title_case};
pub use columns::{normalized_column_names, resolve_column};
