//! Recommendation Table Loading
//!
//! Loads the crop/fertilizer recommendation dataset with Polars and groups it
//! by soil type. The table is built once at startup and shared read-only.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;

use crate::utils::{normalize_key, normalized_column_names, resolve_column};

/// One dataset row: a crop suited to a soil type, its ideal growing
/// conditions and the recommended fertilizer.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRecommendation {
    pub crop_type: String,
    pub temperature: f64,
    pub humidity: f64,
    pub nitrogen: f64,
    pub phosphorous: f64,
    pub potassium: f64,
    pub fertilizer: String,
}

/// Soil type (normalized) → recommendations in dataset row order
#[derive(Debug, Default)]
pub struct RecommendationTable {
    by_soil: FxHashMap<String, Vec<CropRecommendation>>,
}

impl RecommendationTable {
    /// Load the table, degrading to an empty table on any failure.
    ///
    /// An empty table means "no recommendations available"; every prediction
    /// then reports missing data instead of the server refusing to start.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!("Error loading crop recommendations: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load the table from a CSV file, failing on the first bad row.
    pub fn try_load(path: &Path) -> Result<Self> {
        // Every column is read as text; values are trimmed before parsing.
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
            .finish()
            .with_context(|| format!("Failed to load recommendations CSV: {}", path.display()))?;

        Self::from_dataframe(&df)
    }

    fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let names = normalized_column_names(df);
        let ctx = "crop recommendations";

        let soil_col = text_column(df, resolve_column(&names, &["soil type"], ctx)?)?;
        let crop_col = text_column(df, resolve_column(&names, &["crop type"], ctx)?)?;
        // The published dataset spells it "Temparature"
        let temp_col = text_column(df, resolve_column(&names, &["temparature", "temperature"], ctx)?)?;
        let humidity_col = text_column(df, resolve_column(&names, &["humidity"], ctx)?)?;
        let nitrogen_col = text_column(df, resolve_column(&names, &["nitrogen"], ctx)?)?;
        let phosphorous_col = text_column(df, resolve_column(&names, &["phosphorous"], ctx)?)?;
        let potassium_col = text_column(df, resolve_column(&names, &["potassium"], ctx)?)?;
        let fertilizer_col = text_column(df, resolve_column(&names, &["fertilizer name"], ctx)?)?;

        let mut table = Self::default();

        for idx in 0..df.height() {
            // Header is line 1
            let line = idx + 2;
            let soil_type = required_text(soil_col, idx, line, "soil type")?;

            let record = CropRecommendation {
                crop_type: text_or_blank(crop_col, idx),
                temperature: required_number(temp_col, idx, line, "temperature")?,
                humidity: required_number(humidity_col, idx, line, "humidity")?,
                nitrogen: required_number(nitrogen_col, idx, line, "nitrogen")?,
                phosphorous: required_number(phosphorous_col, idx, line, "phosphorous")?,
                potassium: required_number(potassium_col, idx, line, "potassium")?,
                fertilizer: text_or_blank(fertilizer_col, idx),
            };

            table.insert(soil_type, record);
        }

        tracing::info!(
            "Loaded {} crop recommendations across {} soil types",
            df.height(),
            table.len()
        );

        Ok(table)
    }

    /// Build a table from `(soil_type, record)` pairs, keeping pair order.
    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, CropRecommendation)>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for (soil_type, record) in records {
            table.insert(soil_type.as_ref(), record);
        }
        table
    }

    fn insert(&mut self, soil_type: &str, record: CropRecommendation) {
        self.by_soil
            .entry(normalize_key(soil_type))
            .or_default()
            .push(record);
    }

    /// Recommendations for a soil type (case and whitespace insensitive).
    pub fn lookup(&self, soil_type: &str) -> &[CropRecommendation] {
        self.by_soil
            .get(&normalize_key(soil_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct, non-blank crop names for a soil type. Order is not significant.
    pub fn crop_names(&self, soil_type: &str) -> Vec<String> {
        let unique: std::collections::HashSet<&str> = self
            .lookup(soil_type)
            .iter()
            .map(|r| r.crop_type.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        unique.into_iter().map(str::to_string).collect()
    }

    /// First record under `soil_type` whose crop name equals `crop_type` exactly.
    pub fn find_crop(&self, soil_type: &str, crop_type: &str) -> Option<&CropRecommendation> {
        if crop_type.is_empty() {
            return None;
        }
        self.lookup(soil_type)
            .iter()
            .find(|r| r.crop_type == crop_type)
    }

    /// Normalized soil types present in the table, sorted.
    pub fn soil_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.by_soil.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of distinct soil types
    pub fn len(&self) -> usize {
        self.by_soil.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_soil.is_empty()
    }
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    df.column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .str()
        .with_context(|| format!("Column '{}' is not string type", name))
}

fn required_text<'a>(
    column: &'a StringChunked,
    idx: usize,
    line: usize,
    field: &str,
) -> Result<&'a str> {
    column
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("line {}: missing {}", line, field))
}

/// Trimmed text cell; blank or null cells become an empty string.
fn text_or_blank(column: &StringChunked, idx: usize) -> String {
    column.get(idx).map(str::trim).unwrap_or_default().to_string()
}

fn required_number(column: &StringChunked, idx: usize, line: usize, field: &str) -> Result<f64> {
    let raw = required_text(column, idx, line, field)?;
    raw.parse::<f64>()
        .with_context(|| format!("line {}: {} '{}' is not a number", line, field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_CSV: &str = "\
Temparature,Humidity ,Moisture,Soil Type,Crop Type,Nitrogen,Potassium,Phosphorous,Fertilizer Name
26,52,38,Sandy,Maize,37,0,0,Urea
29,52,45,Loamy,Sugarcane,12,0,36,DAP
34,65,62, Black ,Cotton,7,9,30,14-35-14
32,62,34,Red,Tobacco,22,0,20,28-28
28,54,46,Clayey,Paddy,35,0,0,Urea
26,52,35,Sandy,Barley,12,10,13,17-17-17
26,52,35,Sandy,Maize,10,10,10,20-20
";

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn record(crop: &str) -> CropRecommendation {
        CropRecommendation {
            crop_type: crop.to_string(),
            temperature: 25.0,
            humidity: 60.0,
            nitrogen: 10.0,
            phosphorous: 20.0,
            potassium: 5.0,
            fertilizer: "Urea".to_string(),
        }
    }

    #[test]
    fn test_load_groups_rows_by_normalized_soil_type() {
        let file = write_csv(SAMPLE_CSV);
        let table = RecommendationTable::try_load(file.path()).unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(table.soil_types(), vec!["black", "clayey", "loamy", "red", "sandy"]);

        let sandy = table.lookup("sandy");
        assert_eq!(sandy.len(), 3);
        assert_eq!(sandy[0].crop_type, "Maize");
        assert_eq!(sandy[1].crop_type, "Barley");
        assert_eq!(sandy[0].fertilizer, "Urea");
        approx::assert_relative_eq!(sandy[0].temperature, 26.0);
        approx::assert_relative_eq!(sandy[0].nitrogen, 37.0);
    }

    #[test]
    fn test_load_reads_padded_headers_and_values() {
        let file = write_csv(SAMPLE_CSV);
        let table = RecommendationTable::try_load(file.path()).unwrap();

        let black = table.lookup("Black");
        assert_eq!(black.len(), 1);
        approx::assert_relative_eq!(black[0].humidity, 65.0);
        approx::assert_relative_eq!(black[0].phosphorous, 30.0);
        approx::assert_relative_eq!(black[0].potassium, 9.0);
    }

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let table = RecommendationTable::from_records(vec![
            ("Alluvial soil", record("Rice")),
            ("ALLUVIAL SOIL ", record("Wheat")),
        ]);

        let canonical = table.lookup("Alluvial soil");
        assert_eq!(canonical.len(), 2);
        assert_eq!(table.lookup(" alluvial soil "), canonical);
        assert_eq!(table.lookup("ALLUVIAL SOIL"), canonical);
    }

    #[test]
    fn test_crop_names_are_deduplicated() {
        let file = write_csv(SAMPLE_CSV);
        let table = RecommendationTable::try_load(file.path()).unwrap();

        let mut names = table.crop_names("SANDY");
        names.sort();
        assert_eq!(names, vec!["Barley".to_string(), "Maize".to_string()]);
        assert!(table.crop_names("peat").is_empty());
    }

    #[test]
    fn test_find_crop_returns_first_match() {
        let file = write_csv(SAMPLE_CSV);
        let table = RecommendationTable::try_load(file.path()).unwrap();

        let maize = table.find_crop("sandy", "Maize").unwrap();
        assert_eq!(maize.fertilizer, "Urea");
        assert!(table.find_crop("sandy", "maize").is_none());
        assert!(table.find_crop("loamy", "Maize").is_none());
        assert!(table.find_crop("unknown", "Maize").is_none());
    }

    #[test]
    fn test_missing_column_degrades_to_empty_table() {
        let file = write_csv("Soil Type,Crop Type\nSandy,Maize\n");
        assert!(RecommendationTable::try_load(file.path()).is_err());
        assert!(RecommendationTable::load(file.path()).is_empty());
    }

    #[test]
    fn test_unparseable_number_degrades_to_empty_table() {
        let csv = SAMPLE_CSV.replace("29,52,45,Loamy", "warm,52,45,Loamy");
        let file = write_csv(&csv);

        let err = RecommendationTable::try_load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
        assert!(RecommendationTable::load(file.path()).is_empty());
    }

    #[test]
    fn test_blank_crop_and_fertilizer_cells_are_kept() {
        let csv = SAMPLE_CSV.replace("Red,Tobacco,22,0,20,28-28", "Red, ,22,0,20,");
        let file = write_csv(&csv);

        let table = RecommendationTable::try_load(file.path()).unwrap();
        assert_eq!(table.len(), 5);

        let red = table.lookup("red");
        assert_eq!(red.len(), 1);
        assert_eq!(red[0].crop_type, "");
        assert_eq!(red[0].fertilizer, "");
        approx::assert_relative_eq!(red[0].nitrogen, 22.0);

        // Blank names are not offered as crops and never match a lookup
        assert!(table.crop_names("red").is_empty());
        assert!(table.find_crop("red", "").is_none());
    }

    #[test]
    fn test_blank_soil_type_degrades_to_empty_table() {
        let csv = SAMPLE_CSV.replace("Clayey,Paddy", " ,Paddy");
        let file = write_csv(&csv);

        let err = RecommendationTable::try_load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 6: missing soil type"));
        assert!(RecommendationTable::load(file.path()).is_empty());
    }

    #[test]
    fn test_missing_file_degrades_to_empty_table() {
        let table = RecommendationTable::load(Path::new("/nonexistent/crops.csv"));
        assert!(table.is_empty());
        assert!(table.lookup("sandy").is_empty());
    }
}
