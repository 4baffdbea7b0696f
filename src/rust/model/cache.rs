use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use log::info;
use ndarray::Array4;

use super::{infer, introspect, FallbackLoader, InferenceResult, ModelError, ModelHandle, ModelShape, TargetSize};

/// A loaded model together with what introspection found out about it.
#[derive(Debug)]
pub struct LoadedModel {
    handle: Arc<dyn ModelHandle>,
    shape: ModelShape,
}

impl LoadedModel {
    pub fn new(handle: Arc<dyn ModelHandle>) -> Self {
        let shape = introspect(handle.as_ref());
        Self { handle, shape }
    }

    pub fn handle(&self) -> &Arc<dyn ModelHandle> {
        &self.handle
    }

    pub fn shape(&self) -> &ModelShape {
        &self.shape
    }

    pub fn target_size(&self) -> TargetSize {
        self.shape.target_size
    }

    pub fn class_names(&self) -> Option<&[String]> {
        self.shape.class_names.as_deref()
    }

    pub fn infer(&self, input: &Array4<f32>) -> Result<InferenceResult, ModelError> {
        infer(self.handle.as_ref(), input)
    }
}

/// Holds at most one loaded model for the lifetime of the process.
///
/// The slot is filled on the first successful [`get_or_load`](Self::get_or_load)
/// and never cleared. No lock is held while loading, so concurrent first
/// callers may each load the artifact; the last one to finish is kept.
#[derive(Debug)]
pub struct ModelCache {
    path: PathBuf,
    loader: FallbackLoader,
    slot: RwLock<Option<Arc<LoadedModel>>>,
}

impl ModelCache {
    pub fn new(path: impl Into<PathBuf>, loader: FallbackLoader) -> Self {
        Self {
            path: path.into(),
            loader,
            slot: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached model, if one has been loaded.
    pub fn get(&self) -> Option<Arc<LoadedModel>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }

    /// Returns the cached model, loading it first if the slot is empty.
    /// A failed load leaves the slot empty.
    pub fn get_or_load(&self) -> Result<Arc<LoadedModel>, ModelError> {
        if let Some(model) = self.get() {
            return Ok(model);
        }

        let loaded = Arc::new(LoadedModel::new(self.loader.acquire(&self.path)?));
        info!(
            "Model ready: target size {}x{}, {:?} outputs",
            loaded.target_size().width,
            loaded.target_size().height,
            loaded.shape().output_cardinality
        );
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&loaded));
        Ok(loaded)
    }
}
