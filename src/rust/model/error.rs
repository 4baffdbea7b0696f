use std::path::PathBuf;

/// Longest error text carried by a [`ModelError::ModelLoad`] or logged for a failed strategy.
pub const MAX_ERROR_LEN: usize = 200;

/// Represents the different types of errors that can occur while loading or running a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The artifact path does not exist
    #[error("Model artifact not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Every load strategy failed; carries the truncated text of the last failure
    #[error("Failed to load model via all methods. Last error: {0}")]
    ModelLoad(String),
    /// ONNX Runtime could not be initialised
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The artifact bytes could not be decoded
    #[error("Malformed artifact: {0}")]
    MalformedArtifact(String),
    /// The model rejected its input or produced unusable output
    #[error("Inference error: {0}")]
    Inference(String),
}

/// Cuts `message` down to at most `max` characters without splitting a code point.
pub(crate) fn truncate_error(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((end, _)) => message[..end].to_string(),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_error_keeps_short_messages() {
        assert_eq!(truncate_error("short", MAX_ERROR_LEN), "short");
    }

    #[test]
    fn test_truncate_error_cuts_on_char_boundary() {
        let message = "é".repeat(300);
        let truncated = truncate_error(&message, MAX_ERROR_LEN);
        assert_eq!(truncated.chars().count(), MAX_ERROR_LEN);
    }
}
