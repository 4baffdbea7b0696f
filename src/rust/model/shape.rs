use log::warn;

use super::ModelHandle;

/// The `(width, height)` an image is resized to before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

/// Used whenever the model does not declare a usable input size.
pub const DEFAULT_TARGET_SIZE: TargetSize = TargetSize { width: 224, height: 224 };

/// What a loaded model says about its own inputs and outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelShape {
    pub target_size: TargetSize,
    /// Final output dimension; `None` when dynamic or undeclared.
    pub output_cardinality: Option<usize>,
    pub class_names: Option<Vec<String>>,
}

/// Reads target size, output cardinality and class names from `model`.
///
/// Never fails: an unusable input shape falls back to [`DEFAULT_TARGET_SIZE`]
/// with a warning.
pub fn introspect(model: &dyn ModelHandle) -> ModelShape {
    let target_size = match model.input_dims().as_deref() {
        Some([_, height, width, ..]) if *height > 0 && *width > 0 => match (u32::try_from(*width), u32::try_from(*height)) {
            (Ok(width), Ok(height)) => TargetSize { width, height },
            _ => {
                warn!("Model input size {}x{} out of range; using default", height, width);
                DEFAULT_TARGET_SIZE
            }
        },
        other => {
            warn!("Could not infer input size from {:?}; using default 224x224", other);
            DEFAULT_TARGET_SIZE
        }
    };

    let output_cardinality = model
        .output_dims()
        .and_then(|dims| dims.last().copied())
        .filter(|&d| d > 0)
        .map(|d| d as usize);

    let class_names = model.class_names();
    if class_names.is_none() {
        warn!("Model carries no class names; the built-in label list will be used");
    }

    ModelShape {
        target_size,
        output_cardinality,
        class_names,
    }
}
