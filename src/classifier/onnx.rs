//! ONNX soil classifier backed by tract.
//!
//! Expects the MobileNet soil model exported to ONNX with a single NHWC
//! `[1, 224, 224, 3]` float input and an 11-way softmax output.

use std::path::Path;

use anyhow::Context;
use tract_onnx::prelude::*;

use super::{ClassifierError, Prediction, SoilClassifier};
use crate::imaging::ImageTensor;

type RunnableSoilModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub struct OnnxClassifier {
    model: RunnableSoilModel,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier").finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load and optimize the model once at startup.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let [n, h, w, c] = ImageTensor::SHAPE;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("Failed to read ONNX model: {}", path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(n, h, w, c)))?
            .into_optimized()
            .context("Failed to optimize soil model")?
            .into_runnable()
            .context("Failed to build runnable soil model")?;

        Ok(Self { model })
    }
}

impl SoilClassifier for OnnxClassifier {
    fn predict(&self, tensor: &ImageTensor) -> Result<Prediction, ClassifierError> {
        let [n, h, w, c] = ImageTensor::SHAPE;
        let input = tract_ndarray::Array4::from_shape_vec((n, h, w, c), tensor.as_slice().to_vec())
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let outputs = self
            .model
            .run(tvec!(input.into_tensor().into()))
            .map_err(|e| ClassifierError::Inference(format!("{:#}", e)))?;

        let output = outputs
            .first()
            .ok_or_else(|| ClassifierError::Inference("model produced no outputs".to_string()))?;
        let scores: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("{:#}", e)))?
            .iter()
            .copied()
            .collect();

        Prediction::from_scores(&scores)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
