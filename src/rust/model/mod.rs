//! Model acquisition, shape introspection and inference.
//!
//! A model is anything implementing [`ModelHandle`]. Handles come out of a
//! [`FallbackLoader`], which tries an ordered list of [`LoadStrategy`]s until one
//! succeeds, and are memoized by a [`ModelCache`].

mod cache;
mod error;
mod inference;
pub mod layers;
mod onnx;
mod reconstruct;
mod shape;
mod strategy;

use std::fmt::Debug;

use ndarray::Array4;

pub use cache::{LoadedModel, ModelCache};
pub use error::{ModelError, MAX_ERROR_LEN};
pub(crate) use error::truncate_error;
pub use inference::{infer, InferenceResult};
pub use onnx::OnnxModel;
pub use reconstruct::ReconstructedModel;
pub use shape::{introspect, ModelShape, TargetSize, DEFAULT_TARGET_SIZE};
pub use strategy::{acquire_model, CompiledLoad, DirectLoad, FallbackLoader, LoadStrategy, Reconstruct};

/// A loaded model that can score one preprocessed image at a time.
///
/// Dimensions follow the ONNX convention: `-1` marks a dynamic axis.
pub trait ModelHandle: Send + Sync + Debug {
    /// Declared input shape, `[batch, height, width, channels]`.
    fn input_dims(&self) -> Option<Vec<i64>>;

    /// Declared output shape, `[batch, classes]`.
    fn output_dims(&self) -> Option<Vec<i64>>;

    /// Class names embedded in the model, in output order.
    fn class_names(&self) -> Option<Vec<String>> {
        None
    }

    /// Runs the model on a `[1, H, W, C]` batch and returns the scores of the single row.
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, ModelError>;
}
