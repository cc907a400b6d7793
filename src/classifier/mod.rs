//! Classifier Adapter
//!
//! Wraps the pretrained soil model behind `SoilClassifier` so handlers only
//! ever see a normalized label. The model itself is opaque: tensor in,
//! probability vector over `SOIL_LABELS` out.

mod fixed;
mod labels;
mod onnx;

pub use fixed::FixedClassifier;
pub use labels::{class_label, NUM_CLASSES, SOIL_LABELS};
pub use onnx::OnnxClassifier;

use std::fmt;

use thiserror::Error;

use crate::imaging::ImageTensor;
use crate::utils::normalize_key;

/// Error type for classifier operations.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model returned {actual} scores, expected {expected}")]
    OutputShape { expected: usize, actual: usize },

    #[error("model returned a non-finite score at index {0}")]
    NonFiniteScore(usize),
}

/// Trait for soil classifiers.
///
/// Implementations are loaded once at startup and shared read-only across
/// requests; `predict` is CPU-bound and is called from the blocking pool.
pub trait SoilClassifier: Send + Sync + fmt::Debug {
    /// Classify a normalized image tensor.
    fn predict(&self, tensor: &ImageTensor) -> Result<Prediction, ClassifierError>;

    /// Short name for logs (e.g., "onnx", "fixed").
    fn name(&self) -> &str;
}

/// Highest-scoring soil class for one image.
///
/// There is no confidence floor: every image yields a label. `confidence` is
/// kept for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    /// Normalized (trimmed, lowercase) label used for table lookups
    pub label: String,
    pub confidence: f32,
}

impl Prediction {
    /// Pick the argmax of a probability vector over `SOIL_LABELS`.
    ///
    /// Ties resolve to the lowest index.
    pub fn from_scores(scores: &[f32]) -> Result<Self, ClassifierError> {
        if scores.len() != NUM_CLASSES {
            return Err(ClassifierError::OutputShape {
                expected: NUM_CLASSES,
                actual: scores.len(),
            });
        }
        if let Some(idx) = scores.iter().position(|s| !s.is_finite()) {
            return Err(ClassifierError::NonFiniteScore(idx));
        }

        let mut best = 0;
        for (idx, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = idx;
            }
        }

        Ok(Self::for_index(best, scores[best]))
    }

    fn for_index(index: usize, confidence: f32) -> Self {
        let label = class_label(index).unwrap_or_default();
        Self {
            index,
            label: normalize_key(label),
            confidence,
        }
    }
}
