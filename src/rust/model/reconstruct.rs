use std::path::Path;

use log::{debug, info, warn};
use ndarray::{Array, Array4, Axis, Dimension};

use super::layers::{global_average_pool, Activation, Conv2d, Dense};
use super::{ModelError, ModelHandle};
use crate::artifact::{InputShape, OnnxArtifact, TensorData};

const CONV_FILTERS: [usize; 3] = [32, 64, 128];
const CONV_KERNEL: usize = 3;
const CONV_STRIDE: usize = 2;
const HEAD_NAME: &str = "dense";

/// The fixed fallback topology: three stride-2 convolutions, global average
/// pooling and a dense classification head.
///
/// Layers are named `conv1`..`conv3` and `dense`; their parameters are
/// `<layer>/kernel` and `<layer>/bias`. Parameters with no matching weight in
/// the artifact stay zero.
#[derive(Debug, Clone)]
pub struct ReconstructedModel {
    input_shape: InputShape,
    convs: Vec<Conv2d>,
    head: Dense,
    class_names: Option<Vec<String>>,
}

impl ReconstructedModel {
    /// A zero-weight network for `input_shape` with `classes` outputs.
    pub fn new(input_shape: InputShape, classes: usize, activation: Activation) -> Self {
        let mut channels = input_shape.channels;
        let convs = CONV_FILTERS
            .iter()
            .enumerate()
            .map(|(i, &filters)| {
                let conv = Conv2d::new(&format!("conv{}", i + 1), CONV_KERNEL, channels, filters, CONV_STRIDE);
                channels = filters;
                conv
            })
            .collect();
        let head = Dense::new(HEAD_NAME, channels, classes.max(1), activation);

        Self {
            input_shape,
            convs,
            head,
            class_names: None,
        }
    }

    /// Rebuilds the network described by the artifact at `path` and loads its matching weights.
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        Self::from_artifact(&OnnxArtifact::read(path)?)
    }

    /// Rebuilds the network from the artifact's architecture hints.
    ///
    /// Tensors that match no parameter are skipped; parameters nothing matched
    /// stay zero.
    pub fn from_artifact(artifact: &OnnxArtifact) -> Result<Self, ModelError> {
        let hints = artifact.architecture_hints();
        let activation = hints
            .head_activation
            .as_deref()
            .and_then(Activation::from_keras)
            .unwrap_or_else(|| Activation::for_head(hints.num_classes));
        info!(
            "Reconstructing network: input {}x{}x{}, {} classes, {:?} head",
            hints.input_shape.height, hints.input_shape.width, hints.input_shape.channels,
            hints.num_classes, activation
        );

        let mut model = Self::new(hints.input_shape, hints.num_classes, activation);
        let (loaded, skipped) = model.load_weights(artifact);
        info!("Loaded {} weight tensors by name, skipped {}", loaded, skipped);
        if loaded == 0 {
            warn!("No weight tensor matched the reconstructed network; all parameters are zero");
        }
        model.class_names = artifact.class_names();
        Ok(model)
    }

    /// Copies every artifact tensor whose name and shape match a parameter.
    /// Returns `(loaded, skipped)` counts over the network's parameters.
    pub fn load_weights(&mut self, artifact: &OnnxArtifact) -> (usize, usize) {
        let weights = artifact.weights();
        let mut loaded = 0;
        let mut skipped = 0;
        let mut load = |name: String, target: &mut dyn ParamSlot| {
            match weights.get(&name) {
                Some(tensor) if target.accepts(tensor) => {
                    target.load_from(tensor);
                    loaded += 1;
                }
                Some(tensor) => {
                    debug!("Skipping {}: shape {:?} does not match {:?}", name, tensor.dims, target.dims());
                    skipped += 1;
                }
                None => {
                    debug!("Skipping {}: not present in artifact", name);
                    skipped += 1;
                }
            }
        };

        for conv in &mut self.convs {
            load(format!("{}/kernel", conv.name), &mut conv.kernel);
            load(format!("{}/bias", conv.name), &mut conv.bias);
        }
        load(format!("{}/kernel", self.head.name), &mut self.head.kernel);
        load(format!("{}/bias", self.head.name), &mut self.head.bias);

        (loaded, skipped)
    }

    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    pub fn num_classes(&self) -> usize {
        self.head.bias.len()
    }
}

/// A parameter array that can be overwritten from an artifact tensor of the same shape.
trait ParamSlot {
    fn dims(&self) -> Vec<usize>;
    fn load_from(&mut self, tensor: &TensorData);

    fn accepts(&self, tensor: &TensorData) -> bool {
        tensor.dims == self.dims()
    }
}

impl<D: Dimension> ParamSlot for Array<f32, D> {
    fn dims(&self) -> Vec<usize> {
        self.shape().to_vec()
    }

    fn load_from(&mut self, tensor: &TensorData) {
        self.iter_mut()
            .zip(&tensor.values)
            .for_each(|(slot, &value)| *slot = value);
    }
}

impl ModelHandle for ReconstructedModel {
    fn input_dims(&self) -> Option<Vec<i64>> {
        let InputShape { height, width, channels } = self.input_shape;
        Some(vec![-1, height as i64, width as i64, channels as i64])
    }

    fn output_dims(&self) -> Option<Vec<i64>> {
        Some(vec![-1, self.num_classes() as i64])
    }

    fn class_names(&self) -> Option<Vec<String>> {
        self.class_names.clone()
    }

    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, ModelError> {
        let (batch, height, width, channels) = input.dim();
        let expected = self.input_shape;
        if batch == 0 || (height, width, channels) != (expected.height, expected.width, expected.channels) {
            return Err(ModelError::Inference(format!(
                "expected input [1, {}, {}, {}], got {:?}",
                expected.height, expected.width, expected.channels, input.shape()
            )));
        }

        let mut features = input.index_axis(Axis(0), 0).to_owned();
        for conv in &self.convs {
            features = conv.forward(&features);
        }
        let pooled = global_average_pool(&features);
        Ok(self.head.forward(&pooled).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{encode, MODEL_CONFIG_KEY, DEFAULT_INPUT_SHAPE};

    fn artifact(metadata: &[(&str, &str)], tensors: &[Vec<u8>]) -> OnnxArtifact {
        OnnxArtifact::parse(&encode::model(metadata, tensors)).unwrap()
    }

    #[test]
    fn test_uses_declared_batch_shape() {
        let config = r#"{"config": {"layers": [
            {"class_name": "InputLayer", "config": {"batch_shape": [null, 32, 48, 3]}},
            {"class_name": "Dense", "config": {"units": 5, "activation": "softmax"}}
        ]}}"#;
        let bias = encode::float_tensor("dense/bias", &[5], &[0.0, 0.0, 3.0, 0.0, 0.0]);
        let model = ReconstructedModel::from_artifact(&artifact(&[(MODEL_CONFIG_KEY, config)], &[bias])).unwrap();

        assert_eq!(model.input_dims(), Some(vec![-1, 32, 48, 3]));
        let scores = model.predict(&Array4::zeros((1, 32, 48, 3))).unwrap();
        assert_eq!(scores.len(), 5);
        let best = scores.iter().copied().fold(f32::MIN, f32::max);
        assert_eq!(scores[2], best);
    }

    #[test]
    fn test_defaults_without_metadata() {
        let bias = encode::float_tensor("dense/bias", &[38], &[0.0; 38]);
        let model = ReconstructedModel::from_artifact(&artifact(&[], &[bias])).unwrap();
        assert_eq!(model.input_shape(), DEFAULT_INPUT_SHAPE);
        assert_eq!(model.num_classes(), 38);
    }

    #[test]
    fn test_mismatched_shapes_are_skipped() {
        let mut model = ReconstructedModel::new(DEFAULT_INPUT_SHAPE, 2, Activation::Softmax);
        let wrong = encode::float_tensor("conv1/bias", &[16], &[1.0; 16]);
        let right = encode::float_tensor("conv1/kernel", &[3, 3, 3, 32], &vec![0.5; 3 * 3 * 3 * 32]);
        let (loaded, skipped) = model.load_weights(&artifact(&[], &[wrong, right]));
        assert_eq!(loaded, 1);
        assert_eq!(skipped, 7);
        assert!(model.convs[0].bias.iter().all(|&b| b == 0.0));
        assert!(model.convs[0].kernel.iter().all(|&w| w == 0.5));
    }

    #[test]
    fn test_no_matching_weights_still_builds() {
        let config = r#"{"config": {"layers": [
            {"class_name": "InputLayer", "config": {"batch_shape": [null, 16, 16, 3]}},
            {"class_name": "Dense", "config": {"units": 3, "activation": "softmax"}}
        ]}}"#;
        let unrelated = encode::float_tensor("Conv1/kernel", &[2], &[1.0, 2.0]);
        let model =
            ReconstructedModel::from_artifact(&artifact(&[(MODEL_CONFIG_KEY, config)], &[unrelated])).unwrap();

        assert_eq!(model.input_dims(), Some(vec![-1, 16, 16, 3]));
        let scores = model.predict(&Array4::zeros((1, 16, 16, 3))).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|&s| (s - 1.0 / 3.0).abs() < 1e-6));
    }

    #[test]
    fn test_rejects_wrong_input_size() {
        let model = ReconstructedModel::new(InputShape { height: 8, width: 8, channels: 3 }, 1, Activation::Sigmoid);
        assert!(model.predict(&Array4::zeros((1, 4, 4, 3))).is_err());
        assert_eq!(model.predict(&Array4::zeros((1, 8, 8, 3))).unwrap(), vec![0.5]);
    }
}
