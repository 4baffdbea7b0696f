//! Reading a serialized model artifact without ONNX Runtime.
//!
//! The reconstruction strategy only needs two things from the file: the
//! architecture hints recorded in the `model_config` metadata property and the
//! named weight tensors. Both are decoded here straight from the protobuf bytes,
//! so an artifact whose graph the runtime refuses can still donate its weights.

mod proto;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde_json::Value;

use crate::model::ModelError;

pub use proto::TensorData;
#[cfg(test)]
pub(crate) use proto::encode;

/// Metadata property holding the layer-by-layer architecture description.
pub const MODEL_CONFIG_KEY: &str = "model_config";
/// Metadata property holding a JSON array of class names, in output order.
pub const CLASS_NAMES_KEY: &str = "class_names";

/// Input shape used when the artifact does not declare one: 224×224 RGB.
pub const DEFAULT_INPUT_SHAPE: InputShape = InputShape { height: 224, width: 224, channels: 3 };
/// Class count used when the artifact does not declare one.
pub const DEFAULT_NUM_CLASSES: usize = 38;

/// Height, width and channel count of a single input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

/// What the embedded architecture metadata says about the network.
///
/// Every field degrades independently: a missing or malformed value falls back
/// to its default rather than invalidating the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectureHints {
    /// From the first layer's `batch_shape` when it is an `InputLayer`; else [`DEFAULT_INPUT_SHAPE`].
    pub input_shape: InputShape,
    /// From the last layer's `units` when it is a `Dense`; else [`DEFAULT_NUM_CLASSES`].
    pub num_classes: usize,
    /// From the last `Dense` layer's `activation`, if recorded.
    pub head_activation: Option<String>,
}

impl Default for ArchitectureHints {
    fn default() -> Self {
        Self {
            input_shape: DEFAULT_INPUT_SHAPE,
            num_classes: DEFAULT_NUM_CLASSES,
            head_activation: None,
        }
    }
}

impl ArchitectureHints {
    /// Parses a `model_config` JSON document of the form
    /// `{"config": {"layers": [{"class_name": ..., "config": {...}}, ...]}}`.
    pub fn from_model_config(model_config: &str) -> Self {
        let mut hints = Self::default();
        let document: Value = match serde_json::from_str(model_config) {
            Ok(document) => document,
            Err(e) => {
                warn!("Could not parse model_config metadata: {}", e);
                return hints;
            }
        };

        let layers = document.pointer("/config/layers")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if let Some(first) = layers.first() {
            if first.get("class_name").and_then(Value::as_str) == Some("InputLayer") {
                if let Some(shape) = first.get("config").and_then(batch_shape) {
                    hints.input_shape = shape;
                }
            }
        }

        if let Some(last) = layers.last() {
            if last.get("class_name").and_then(Value::as_str) == Some("Dense") {
                let config = last.get("config");
                if let Some(units) = config.and_then(|c| c.get("units")).and_then(Value::as_u64) {
                    if units > 0 {
                        hints.num_classes = units as usize;
                    }
                }
                hints.head_activation = config
                    .and_then(|c| c.get("activation"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
        }

        hints
    }
}

/// Reads `[null, h, w, c]` from `batch_shape` (or the older `batch_input_shape`).
fn batch_shape(config: &Value) -> Option<InputShape> {
    let shape = config.get("batch_shape")
        .or_else(|| config.get("batch_input_shape"))?
        .as_array()?;
    if shape.len() != 4 {
        return None;
    }
    let dim = |i: usize| shape[i].as_u64().filter(|&d| d > 0).map(|d| d as usize);
    Some(InputShape {
        height: dim(1)?,
        width: dim(2)?,
        channels: dim(3)?,
    })
}

/// Parses the `class_names` metadata value; anything but a JSON array of strings yields `None`.
pub fn parse_class_names(raw: &str) -> Option<Vec<String>> {
    serde_json::from_str::<Vec<String>>(raw).ok()
}

/// The parts of an ONNX artifact that survive without a runtime session.
#[derive(Debug, Default)]
pub struct OnnxArtifact {
    metadata: HashMap<String, String>,
    weights: HashMap<String, TensorData>,
}

impl OnnxArtifact {
    /// Reads and decodes the artifact at `path`.
    pub fn read(path: &Path) -> Result<Self, ModelError> {
        let bytes = fs::read(path)?;
        let artifact = Self::parse(&bytes)?;
        info!(
            "Decoded artifact {:?}: {} weight tensors, {} metadata entries",
            path, artifact.weights.len(), artifact.metadata.len()
        );
        Ok(artifact)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        let raw = proto::parse_model(bytes)?;
        Ok(Self {
            metadata: raw.metadata,
            weights: raw.initializers,
        })
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn weights(&self) -> &HashMap<String, TensorData> {
        &self.weights
    }

    /// Architecture hints from `model_config`, or all defaults when it is absent.
    pub fn architecture_hints(&self) -> ArchitectureHints {
        match self.metadata(MODEL_CONFIG_KEY) {
            Some(config) => ArchitectureHints::from_model_config(config),
            None => {
                warn!("Artifact has no {} metadata; using default architecture", MODEL_CONFIG_KEY);
                ArchitectureHints::default()
            }
        }
    }

    pub fn class_names(&self) -> Option<Vec<String>> {
        self.metadata(CLASS_NAMES_KEY).and_then(parse_class_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "class_name": "Functional",
        "config": {"layers": [
            {"class_name": "InputLayer", "config": {"batch_shape": [null, 160, 128, 3]}},
            {"class_name": "GlobalAveragePooling2D", "config": {}},
            {"class_name": "Dense", "config": {"units": 4, "activation": "softmax"}}
        ]}
    }"#;

    #[test]
    fn test_hints_from_full_config() {
        let hints = ArchitectureHints::from_model_config(CONFIG);
        assert_eq!(hints.input_shape, InputShape { height: 160, width: 128, channels: 3 });
        assert_eq!(hints.num_classes, 4);
        assert_eq!(hints.head_activation.as_deref(), Some("softmax"));
    }

    #[test]
    fn test_hints_fall_back_on_garbage() {
        assert_eq!(ArchitectureHints::from_model_config("not json"), ArchitectureHints::default());
    }

    #[test]
    fn test_non_integer_batch_shape_uses_default() {
        let config = r#"{"config": {"layers": [
            {"class_name": "InputLayer", "config": {"batch_shape": [null, "h", 224, 3]}},
            {"class_name": "Dense", "config": {"units": 2}}
        ]}}"#;
        let hints = ArchitectureHints::from_model_config(config);
        assert_eq!(hints.input_shape, DEFAULT_INPUT_SHAPE);
        assert_eq!(hints.num_classes, 2);
        assert_eq!(hints.head_activation, None);
    }

    #[test]
    fn test_last_layer_must_be_dense() {
        let config = r#"{"config": {"layers": [
            {"class_name": "InputLayer", "config": {"batch_input_shape": [null, 96, 96, 3]}},
            {"class_name": "Activation", "config": {"units": 5}}
        ]}}"#;
        let hints = ArchitectureHints::from_model_config(config);
        assert_eq!(hints.input_shape.height, 96);
        assert_eq!(hints.num_classes, DEFAULT_NUM_CLASSES);
    }

    #[test]
    fn test_class_names_metadata() {
        let bytes = encode::model(&[(CLASS_NAMES_KEY, r#"["Healthy","Sick"]"#)], &[]);
        let artifact = OnnxArtifact::parse(&bytes).unwrap();
        assert_eq!(artifact.class_names(), Some(vec!["Healthy".to_string(), "Sick".to_string()]));
        assert_eq!(parse_class_names("{\"not\": \"a list\"}"), None);
    }
}
