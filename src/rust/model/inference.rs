use ndarray::Array4;

use super::{ModelError, ModelHandle};

/// Per-class scores produced for a single image.
///
/// A sigmoid head yields one score (probability of the positive class); a
/// softmax head yields one score per class.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    scores: Vec<f32>,
}

impl InferenceResult {
    pub fn new(scores: Vec<f32>) -> Self {
        Self { scores }
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// True for a single-score sigmoid head.
    pub fn is_binary(&self) -> bool {
        self.scores.len() <= 1
    }

    /// Index and value of the highest score. Ties go to the lowest index; NaN
    /// scores are ignored.
    pub fn argmax(&self) -> Option<(usize, f32)> {
        self.scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| !score.is_nan())
            .fold(None, |best, (i, score)| match best {
                Some((_, top)) if score <= top => best,
                _ => Some((i, score)),
            })
    }
}

impl From<Vec<f32>> for InferenceResult {
    fn from(scores: Vec<f32>) -> Self {
        Self::new(scores)
    }
}

/// Scores one preprocessed image. An empty output is treated as an inference failure.
pub fn infer(model: &dyn ModelHandle, input: &Array4<f32>) -> Result<InferenceResult, ModelError> {
    let scores = model.predict(input)?;
    if scores.is_empty() {
        return Err(ModelError::Inference("model produced no scores".to_string()));
    }
    Ok(InferenceResult::new(scores))
}
