use serde::{Serialize, Serializer};

use super::interpret::round2;
use crate::model::InferenceResult;

/// Multi-class models count as "plant" when the top score exceeds this.
///
/// The classifier has no "not a plant" class, so this is a weak heuristic.
pub const PLANT_CONFIDENCE_THRESHOLD: f32 = 0.1;
/// Single-score models count as "plant" at or above this.
pub const BINARY_PLANT_THRESHOLD: f32 = 0.5;

fn serialize_percent<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(f64::from(*value) * 100.0))
}

/// Whether an image looks like a plant. Probabilities are stored in `[0, 1]`
/// and serialized as percentages with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantCheck {
    pub success: bool,
    pub is_plant: bool,
    #[serde(serialize_with = "serialize_percent")]
    pub confidence: f32,
    #[serde(serialize_with = "serialize_percent")]
    pub plant_probability: f32,
}

pub fn validate_plant(result: &InferenceResult) -> PlantCheck {
    let (is_plant, confidence, plant_probability) = if result.is_binary() {
        let score = result.scores().first().copied().unwrap_or(0.0);
        let is_plant = score >= BINARY_PLANT_THRESHOLD;
        let confidence = if is_plant { score } else { 1.0 - score };
        (is_plant, confidence, score)
    } else {
        let (_, confidence) = result.argmax().unwrap_or((0, 0.0));
        let is_plant = confidence > PLANT_CONFIDENCE_THRESHOLD;
        let plant_probability = if is_plant { confidence } else { 1.0 - confidence };
        (is_plant, confidence, plant_probability)
    };

    PlantCheck {
        success: true,
        is_plant,
        confidence,
        plant_probability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiclass_low_confidence_is_not_plant() {
        let check = validate_plant(&InferenceResult::new(vec![0.05, 0.08, 0.07]));
        assert!(!check.is_plant);
        assert!((check.plant_probability - 0.92).abs() < 1e-6);
    }

    #[test]
    fn test_binary_uses_score_as_probability() {
        let check = validate_plant(&InferenceResult::new(vec![0.25]));
        assert!(!check.is_plant);
        assert_eq!(check.plant_probability, 0.25);
        assert_eq!(check.confidence, 0.75);
    }

    #[test]
    fn test_serialized_as_percentages() {
        let check = validate_plant(&InferenceResult::new(vec![0.123456, 0.8]));
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["is_plant"], true);
        assert_eq!(json["confidence"], serde_json::json!(80.0));
        assert_eq!(json["plant_probability"], serde_json::json!(80.0));
    }
}
