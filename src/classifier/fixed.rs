//! Fixed classifier for testing.
//!
//! Always answers with the same label, so handler tests run without a model
//! file and can steer the prediction (including labels the table lacks).

use super::{ClassifierError, Prediction, SoilClassifier, NUM_CLASSES, SOIL_LABELS};
use crate::imaging::ImageTensor;
use crate::utils::normalize_key;

#[derive(Debug, Clone)]
pub struct FixedClassifier {
    prediction: Prediction,
}

impl FixedClassifier {
    /// Answer `label` for every image.
    ///
    /// Labels outside `SOIL_LABELS` get index `NUM_CLASSES`.
    pub fn new(label: &str) -> Self {
        let label = normalize_key(label);
        let index = SOIL_LABELS
            .iter()
            .position(|l| normalize_key(l) == label)
            .unwrap_or(NUM_CLASSES);

        Self {
            prediction: Prediction {
                index,
                label,
                confidence: 1.0,
            },
        }
    }
}

impl SoilClassifier for FixedClassifier {
    fn predict(&self, _tensor: &ImageTensor) -> Result<Prediction, ClassifierError> {
        Ok(self.prediction.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
