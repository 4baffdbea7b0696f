use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};

use super::{truncate_error, ModelError, ModelHandle, OnnxModel, ReconstructedModel, MAX_ERROR_LEN};
use crate::runtime::RuntimeConfig;

/// One way of turning an artifact on disk into a model.
pub trait LoadStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn attempt(&self, path: &Path) -> Result<Arc<dyn ModelHandle>, ModelError>;
}

/// Loads the graph exactly as serialized, with no optimization passes.
#[derive(Debug, Default)]
pub struct DirectLoad;

impl LoadStrategy for DirectLoad {
    fn name(&self) -> &str {
        "direct"
    }

    fn attempt(&self, path: &Path) -> Result<Arc<dyn ModelHandle>, ModelError> {
        Ok(Arc::new(OnnxModel::load(path, &RuntimeConfig::unoptimized())?))
    }
}

/// Loads the graph with the configured optimization level and threading.
#[derive(Debug, Default)]
pub struct CompiledLoad {
    pub config: RuntimeConfig,
}

impl LoadStrategy for CompiledLoad {
    fn name(&self) -> &str {
        "compiled"
    }

    fn attempt(&self, path: &Path) -> Result<Arc<dyn ModelHandle>, ModelError> {
        Ok(Arc::new(OnnxModel::load(path, &self.config)?))
    }
}

/// Rebuilds the fixed fallback network and loads only the weights that match it.
#[derive(Debug, Default)]
pub struct Reconstruct;

impl LoadStrategy for Reconstruct {
    fn name(&self) -> &str {
        "reconstruct"
    }

    fn attempt(&self, path: &Path) -> Result<Arc<dyn ModelHandle>, ModelError> {
        Ok(Arc::new(ReconstructedModel::from_path(path)?))
    }
}

/// Tries each strategy in order; the first success wins.
pub struct FallbackLoader {
    strategies: Vec<Box<dyn LoadStrategy>>,
}

impl FallbackLoader {
    pub fn new(strategies: Vec<Box<dyn LoadStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard chain: direct, then compiled with `config`, then reconstruction.
    pub fn with_runtime_config(config: RuntimeConfig) -> Self {
        Self::new(vec![
            Box::new(DirectLoad),
            Box::new(CompiledLoad { config }),
            Box::new(Reconstruct),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Loads the artifact at `path`.
    ///
    /// Fails with [`ModelError::NotFound`] before trying anything if the path is
    /// missing, and with [`ModelError::ModelLoad`] carrying the last strategy's
    /// error (truncated) if every strategy fails.
    pub fn acquire(&self, path: &Path) -> Result<Arc<dyn ModelHandle>, ModelError> {
        if !path.exists() {
            error!("Model artifact not found at {:?}", path);
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let mut last_error = String::from("no load strategy configured");
        for strategy in &self.strategies {
            info!("Loading model from {:?} ({} strategy)", path, strategy.name());
            match strategy.attempt(path) {
                Ok(model) => {
                    info!("Model loaded with {} strategy", strategy.name());
                    return Ok(model);
                }
                Err(e) => {
                    last_error = truncate_error(&e.to_string(), MAX_ERROR_LEN);
                    warn!("{} load failed: {}", strategy.name(), last_error);
                }
            }
        }

        error!("All load strategies failed for {:?}", path);
        Err(ModelError::ModelLoad(last_error))
    }
}

impl Default for FallbackLoader {
    fn default() -> Self {
        Self::with_runtime_config(RuntimeConfig::default())
    }
}

impl fmt::Debug for FallbackLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackLoader")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

/// Loads `path` with the standard strategy chain and default runtime settings.
pub fn acquire_model(path: impl AsRef<Path>) -> Result<Arc<dyn ModelHandle>, ModelError> {
    FallbackLoader::default().acquire(path.as_ref())
}
