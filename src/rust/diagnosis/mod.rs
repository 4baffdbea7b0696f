//! Turning model scores into something a grower can act on.

mod interpret;
pub mod knowledge_base;
mod plant;

pub use interpret::{interpret, resolve_class_key, Diagnosis, Label, HEALTHY_THRESHOLD};
pub use knowledge_base::{DiseaseRecord, FALLBACK_CLASS_NAMES};
pub use plant::{validate_plant, PlantCheck, BINARY_PLANT_THRESHOLD, PLANT_CONFIDENCE_THRESHOLD};
