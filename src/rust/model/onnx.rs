use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use ndarray::Array4;
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::{ModelError, ModelHandle};
use crate::artifact::{parse_class_names, CLASS_NAMES_KEY};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A model whose graph ONNX Runtime accepted as-is.
#[derive(Debug)]
pub struct OnnxModel {
    session: Session,
    input_name: String,
    input_dims: Option<Vec<i64>>,
    output_dims: Option<Vec<i64>>,
    class_names: Option<Vec<String>>,
}

fn tensor_dims(value_type: &ValueType) -> Option<Vec<i64>> {
    match value_type {
        ValueType::Tensor { dimensions, .. } => Some(dimensions.clone()),
        _ => None,
    }
}

impl OnnxModel {
    /// Builds a session for the artifact at `path` using `config`.
    pub fn load(path: &Path, config: &RuntimeConfig) -> Result<Self, ModelError> {
        let session = create_session_builder(config)?.commit_from_file(path)?;
        Self::from_session(session)
    }

    /// Wraps a committed session, reading its signature and embedded class names.
    pub fn from_session(session: Session) -> Result<Self, ModelError> {
        let input = session.inputs.first().ok_or_else(|| {
            ModelError::MalformedArtifact("Model must have at least 1 input".to_string())
        })?;
        let output = session.outputs.first().ok_or_else(|| {
            ModelError::MalformedArtifact("Model must have at least 1 output".to_string())
        })?;

        let input_name = input.name.clone();
        let input_dims = tensor_dims(&input.input_type);
        let output_dims = tensor_dims(&output.output_type);
        debug!("Session input {:?} dims {:?}, output dims {:?}", input_name, input_dims, output_dims);

        let class_names = match session.metadata() {
            Ok(metadata) => metadata
                .custom(CLASS_NAMES_KEY)
                .ok()
                .flatten()
                .and_then(|raw| parse_class_names(&raw)),
            Err(e) => {
                warn!("Could not read model metadata: {}", e);
                None
            }
        };

        Ok(Self {
            session,
            input_name,
            input_dims,
            output_dims,
            class_names,
        })
    }
}

impl ModelHandle for OnnxModel {
    fn input_dims(&self) -> Option<Vec<i64>> {
        self.input_dims.clone()
    }

    fn output_dims(&self) -> Option<Vec<i64>> {
        self.output_dims.clone()
    }

    fn class_names(&self) -> Option<Vec<String>> {
        self.class_names.clone()
    }

    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, ModelError> {
        let tensor = Tensor::from_array(input.as_standard_layout().into_owned())?;
        let mut input_tensors = HashMap::new();
        input_tensors.insert(self.input_name.as_str(), tensor);

        let outputs = self.session.run(input_tensors)?;
        let scores = outputs[0].try_extract_tensor::<f32>()?;

        // Scores for the first (only) image in the batch.
        let row = match scores.ndim() {
            0 => vec![scores.iter().copied().next().unwrap_or_default()],
            1 => scores.iter().copied().collect(),
            _ => scores.index_axis(ndarray::Axis(0), 0).iter().copied().collect(),
        };
        Ok(row)
    }
}
