use std::fmt;

use log::{info, warn};
use serde::{Serialize, Serializer};

use super::knowledge_base::{
    healthy_record, humanize_key, lookup, DiseaseRecord, EARLY_BLIGHT_FALLBACK, FALLBACK_CLASS_NAMES,
    GENERIC_CURE, GENERIC_PREVENTION,
};
use crate::model::InferenceResult;

/// Single-score models report "Healthy" at or above this probability.
pub const HEALTHY_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Healthy,
    Diseased,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Healthy => write!(f, "Healthy"),
            Label::Diseased => write!(f, "Diseased"),
        }
    }
}

/// Rounds to two decimals for presentation only.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn serialize_rounded<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(f64::from(*value)))
}

/// The user-facing result for one image.
///
/// `confidence` is kept at full precision and only rounded when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub label: Label,
    #[serde(serialize_with = "serialize_rounded")]
    pub confidence: f32,
    pub disease: String,
    pub cure: String,
    pub prevention: String,
    pub description: String,
}

impl Diagnosis {
    fn from_record(label: Label, confidence: f32, record: &DiseaseRecord) -> Self {
        Self {
            label,
            confidence,
            disease: record.name.to_string(),
            cure: record.cure.to_string(),
            prevention: record.prevention.to_string(),
            description: record.description.to_string(),
        }
    }
}

/// Picks the class key for output `index`: embedded class names first, then
/// the built-in list, then a synthesized `Class_<index>`.
pub fn resolve_class_key(index: usize, class_names: Option<&[String]>) -> String {
    if let Some(name) = class_names.and_then(|names| names.get(index)) {
        return name.clone();
    }
    match FALLBACK_CLASS_NAMES.get(index) {
        Some(key) => key.to_string(),
        None => {
            warn!("Class index {} out of range, using fallback: Class_{}", index, index);
            format!("Class_{}", index)
        }
    }
}

/// Maps raw model scores to a diagnosis. Never fails: unknown classes get a
/// humanized name and generic remediation.
pub fn interpret(result: &InferenceResult, class_names: Option<&[String]>) -> Diagnosis {
    if result.is_binary() {
        let score = result.scores().first().copied().unwrap_or(0.0);
        info!("Binary prediction score: {}", score);
        return if score >= HEALTHY_THRESHOLD {
            Diagnosis::from_record(Label::Healthy, score, &healthy_record())
        } else {
            // A single score cannot name a disease; Early Blight is a placeholder.
            Diagnosis::from_record(Label::Diseased, 1.0 - score, &EARLY_BLIGHT_FALLBACK)
        };
    }

    let (index, confidence) = result.argmax().unwrap_or((0, 0.0));
    let key = resolve_class_key(index, class_names);
    info!("Predicted class index: {} ({}), confidence: {}", index, key, confidence);

    let mut diagnosis = match lookup(&key) {
        Some(record) => Diagnosis::from_record(Label::Diseased, confidence, record),
        None => {
            let name = humanize_key(&key);
            Diagnosis {
                label: Label::Diseased,
                confidence,
                description: format!("Detected: {}", name),
                disease: name,
                cure: GENERIC_CURE.to_string(),
                prevention: GENERIC_PREVENTION.to_string(),
            }
        }
    };
    if diagnosis.disease.contains("Healthy") {
        diagnosis.label = Label::Healthy;
    }
    diagnosis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(len: usize, index: usize) -> InferenceResult {
        let mut scores = vec![0.01; len];
        scores[index] = 0.9;
        InferenceResult::new(scores)
    }

    #[test]
    fn test_binary_threshold_boundary() {
        let healthy = interpret(&InferenceResult::new(vec![0.7]), None);
        assert_eq!(healthy.label, Label::Healthy);
        assert_eq!(healthy.disease, "Healthy");
        assert_eq!(round2(f64::from(healthy.confidence)), 0.7);

        let diseased = interpret(&InferenceResult::new(vec![0.6999]), None);
        assert_eq!(diseased.label, Label::Diseased);
        assert_eq!(diseased.disease, "Early Blight");
        assert!((diseased.confidence - 0.3001).abs() < 1e-6);
        assert_eq!(round2(f64::from(diseased.confidence)), 0.3);
    }

    #[test]
    fn test_fallback_list_index_21() {
        let diagnosis = interpret(&one_hot(31, 21), None);
        assert_eq!(diagnosis.disease, "Bacterial Spot");
        assert_eq!(diagnosis.label, Label::Diseased);
        assert!((diagnosis.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_embedded_class_names_win() {
        let names: Vec<String> = vec!["Foo___Bar".into(), "Tomato___Healthy".into()];
        let diagnosis = interpret(&one_hot(2, 0), Some(names.as_slice()));
        assert_eq!(diagnosis.disease, "Foo Bar");
        assert_eq!(diagnosis.cure, GENERIC_CURE);
        assert_eq!(diagnosis.prevention, GENERIC_PREVENTION);
        assert_eq!(diagnosis.description, "Detected: Foo Bar");

        let healthy = interpret(&one_hot(2, 1), Some(names.as_slice()));
        assert_eq!(healthy.disease, "Tomato Healthy");
        assert_eq!(healthy.label, Label::Healthy);
    }

    #[test]
    fn test_out_of_range_index() {
        let diagnosis = interpret(&one_hot(40, 35), None);
        assert_eq!(diagnosis.disease, "Class 35");
        assert_eq!(diagnosis.label, Label::Diseased);
    }

    #[test]
    fn test_serialized_confidence_is_rounded() {
        let diagnosis = interpret(&InferenceResult::new(vec![0.6999]), None);
        let json = serde_json::to_value(&diagnosis).unwrap();
        assert_eq!(json["confidence"], serde_json::json!(0.3));
        assert_eq!(json["label"], "Diseased");
    }
}
