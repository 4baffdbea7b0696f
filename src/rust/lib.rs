//! Plant disease detection: model loading with graceful fallback, shape
//! introspection and score-to-diagnosis mapping, served over HTTP.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use agrovision::{acquire_model, infer, interpret, introspect, preprocess::image_bytes_to_input};
//!
//! let model = acquire_model("plant_disease_model.onnx")?;
//! let shape = introspect(model.as_ref());
//!
//! let bytes = std::fs::read("leaf.jpg")?;
//! let input = image_bytes_to_input(&bytes, shape.target_size)?;
//! let result = infer(model.as_ref(), &input)?;
//!
//! let diagnosis = interpret(&result, shape.class_names.as_deref());
//! println!("{}: {} ({:.2})", diagnosis.label, diagnosis.disease, diagnosis.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! # Loading
//!
//! [`acquire_model`] tries, in order: a direct ONNX Runtime load with graph
//! optimizations off, an optimized load, and finally a rebuild of a fixed
//! convolutional network that takes whichever weights in the artifact match
//! it by name and shape. Servers should hold a [`ModelCache`] instead, which
//! runs the same chain once and keeps the result.

pub mod artifact;
pub mod chat;
pub mod config;
pub mod diagnosis;
pub mod model;
pub mod model_manager;
pub mod preprocess;
mod runtime;
pub mod server;

pub use config::ServerConfig;
pub use diagnosis::{interpret, validate_plant, Diagnosis, Label, PlantCheck};
pub use model::{
    acquire_model, infer, introspect, FallbackLoader, InferenceResult, LoadStrategy, ModelCache, ModelError,
    ModelHandle, ModelShape, TargetSize,
};
pub use model_manager::{ArtifactError, ArtifactSource, ModelManager};
pub use runtime::{create_session_builder, RuntimeConfig};

/// Installs `env_logger` as the `log` backend, honouring `RUST_LOG`.
/// Later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_is_repeatable() {
        init_logger();
        init_logger();
        log::info!("logger installed");
    }
}
