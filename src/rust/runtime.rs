use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use std::sync::OnceLock;

use crate::model::ModelError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Session settings applied when the runtime builds a model from an artifact.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl RuntimeConfig {
    /// Loads the graph exactly as serialized, with every optimization pass off.
    pub fn unoptimized() -> Self {
        Self {
            optimization_level: GraphOptimizationLevel::Disable,
            ..Self::default()
        }
    }

    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads;
        self
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

/// Commits the global ONNX Runtime environment once per process.
///
/// A failed initialisation is remembered, so every later caller sees the same error.
pub fn ensure_initialized() -> Result<(), ModelError> {
    INIT.get_or_init(|| {
        ort::init()
            .with_name("agrovision")
            .commit()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })
    .clone()
    .map_err(ModelError::Runtime)
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ModelError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_initialization() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok()); // Second call should be fine
    }

    #[test]
    fn test_session_builder_config() {
        let config = RuntimeConfig {
            inter_threads: 2,
            intra_threads: 2,
            optimization_level: GraphOptimizationLevel::Level1,
        };
        assert!(create_session_builder(&config).is_ok());
        assert!(create_session_builder(&RuntimeConfig::unoptimized()).is_ok());
    }

    #[test]
    fn test_unoptimized_keeps_thread_defaults() {
        let config = RuntimeConfig::unoptimized().with_intra_threads(3);
        assert_eq!(config.inter_threads, 0);
        assert_eq!(config.intra_threads, 3);
        assert!(matches!(config.clone().optimization_level, GraphOptimizationLevel::Disable));
    }
}
