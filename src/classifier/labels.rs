//! Soil class labels
//!
//! Output index `i` of the classifier corresponds to `SOIL_LABELS[i]`; the
//! order is fixed by the training run and must not be re-sorted.

/// Number of soil classes the model distinguishes
pub const NUM_CLASSES: usize = 11;

pub static SOIL_LABELS: [&str; NUM_CLASSES] = [
    "Alluvial soil",
    "Black Soil",
    "Cinder Soil",
    "Clayey soil",
    "Laterite Soil",
    "Loamy soil",
    "Peat Soil",
    "Red soil",
    "Sandy loam",
    "Sandy soil",
    "Yellow Soil",
];

/// Label for a class index, as written in the training set
pub fn class_label(index: usize) -> Option<&'static str> {
    SOIL_LABELS.get(index).copied()
}
