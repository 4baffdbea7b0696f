//! Static remediation table, keyed by the class keys the classifier emits
//! (`<Crop>___<Condition>`).

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Display name and remediation text for one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiseaseRecord {
    pub name: &'static str,
    pub cure: &'static str,
    pub prevention: &'static str,
    pub description: &'static str,
}

/// Key of the generic healthy record, used by single-score models.
pub const HEALTHY_KEY: &str = "Healthy";

/// Remediation reported by a single-score model for anything below the healthy threshold.
pub const EARLY_BLIGHT_FALLBACK: DiseaseRecord = DiseaseRecord {
    name: "Early Blight",
    cure: "Apply copper-based fungicide and remove lower infected leaves.",
    prevention: "Ensure proper spacing and use drip irrigation to keep foliage dry.",
    description: "Your plant shows signs of disease. Immediate action is recommended.",
};

pub const GENERIC_CURE: &str = "Consult with a plant pathologist for specific treatment recommendations.";
pub const GENERIC_PREVENTION: &str = "Maintain good plant hygiene, proper spacing, and monitor regularly.";

/// Class keys by output index, used when the model carries no class names.
pub const FALLBACK_CLASS_NAMES: [&str; 31] = [
    "Apple___Apple_scab", "Apple___Black_rot", "Apple___Cedar_apple_rust", "Apple___Healthy",
    "Cherry___Powdery_mildew", "Cherry___Healthy",
    "Corn___Common_rust", "Corn___Northern_Leaf_Blight", "Corn___Healthy",
    "Grape___Black_rot", "Grape___Esca", "Grape___Leaf_blight", "Grape___Healthy",
    "Peach___Bacterial_spot", "Peach___Healthy",
    "Pepper___bell___Bacterial_spot", "Pepper___bell___Healthy",
    "Potato___Early_blight", "Potato___Late_blight", "Potato___Healthy",
    "Strawberry___Leaf_scorch",
    "Tomato___Bacterial_spot", "Tomato___Early_blight", "Tomato___Late_blight",
    "Tomato___Leaf_Mold", "Tomato___Septoria_leaf_spot", "Tomato___Spider_mites",
    "Tomato___Target_Spot", "Tomato___Tomato_mosaic_virus",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus", "Tomato___Healthy",
];

const fn record(
    name: &'static str,
    cure: &'static str,
    prevention: &'static str,
    description: &'static str,
) -> DiseaseRecord {
    DiseaseRecord { name, cure, prevention, description }
}

lazy_static! {
    static ref DISEASE_DATABASE: HashMap<&'static str, DiseaseRecord> = {
        let mut db = HashMap::new();
        db.insert(HEALTHY_KEY, record(
            "Healthy",
            "N/A",
            "Continue maintaining current care routine. Monitor regularly for early signs of disease.",
            "Your plant appears healthy with no visible signs of disease.",
        ));

        // Tomato
        db.insert("Tomato___Bacterial_spot", record(
            "Bacterial Spot",
            "Remove infected leaves. Apply copper-based bactericides. Avoid overhead watering.",
            "Use disease-free seeds. Rotate crops. Space plants properly for air circulation.",
            "Bacterial spot causes dark, water-soaked lesions on leaves and fruits.",
        ));
        db.insert("Tomato___Early_blight", record(
            "Early Blight",
            "Apply fungicides containing chlorothalonil or mancozeb. Remove lower infected leaves.",
            "Use resistant varieties. Ensure proper spacing. Use drip irrigation to keep foliage dry.",
            "Early blight causes dark brown spots with concentric rings on lower leaves.",
        ));
        db.insert("Tomato___Late_blight", record(
            "Late Blight",
            "Apply fungicides immediately (copper-based or systemic fungicides). Remove and destroy infected plants.",
            "Plant resistant varieties. Avoid overhead watering. Ensure good air circulation.",
            "Late blight causes water-soaked lesions that turn brown and spread rapidly.",
        ));
        db.insert("Tomato___Leaf_Mold", record(
            "Leaf Mold",
            "Apply fungicides containing chlorothalonil. Improve air circulation and reduce humidity.",
            "Use resistant varieties. Space plants properly. Ventilate greenhouses well.",
            "Leaf mold causes yellow spots on upper leaf surfaces with fuzzy gray mold underneath.",
        ));
        db.insert("Tomato___Septoria_leaf_spot", record(
            "Septoria Leaf Spot",
            "Remove infected leaves. Apply fungicides containing chlorothalonil or mancozeb.",
            "Rotate crops. Avoid overhead watering. Remove plant debris after harvest.",
            "Septoria leaf spot causes small, circular spots with dark borders on leaves.",
        ));
        db.insert("Tomato___Spider_mites", record(
            "Spider Mites",
            "Apply insecticidal soap or neem oil. Increase humidity. Remove heavily infested leaves.",
            "Keep plants well-watered. Monitor regularly. Introduce beneficial insects.",
            "Spider mites cause stippling, yellowing, and webbing on leaves.",
        ));
        db.insert("Tomato___Target_Spot", record(
            "Target Spot",
            "Apply fungicides containing azoxystrobin or chlorothalonil. Remove infected leaves.",
            "Use resistant varieties. Ensure proper spacing. Avoid overhead watering.",
            "Target spot causes circular lesions with concentric rings, resembling a target.",
        ));
        db.insert("Tomato___Tomato_mosaic_virus", record(
            "Tomato Mosaic Virus",
            "No cure. Remove and destroy infected plants. Disinfect tools and hands.",
            "Use virus-free seeds. Control aphids. Practice good hygiene in the garden.",
            "Mosaic virus causes mottled, distorted leaves and reduced fruit quality.",
        ));
        db.insert("Tomato___Tomato_Yellow_Leaf_Curl_Virus", record(
            "Yellow Leaf Curl Virus",
            "No cure. Remove infected plants. Control whiteflies with insecticides.",
            "Use resistant varieties. Control whitefly populations. Use row covers.",
            "Yellow leaf curl causes upward curling of leaves and yellowing.",
        ));

        // Potato
        db.insert("Potato___Early_blight", record(
            "Early Blight",
            "Apply fungicides containing chlorothalonil. Remove infected leaves.",
            "Rotate crops. Use certified seed potatoes. Ensure proper spacing.",
            "Early blight causes dark brown spots with target-like rings on leaves.",
        ));
        db.insert("Potato___Late_blight", record(
            "Late Blight",
            "Apply fungicides immediately. Remove and destroy infected plants.",
            "Use certified disease-free seed. Plant resistant varieties. Avoid overhead watering.",
            "Late blight causes rapid browning and death of foliage, affecting tubers.",
        ));

        // Pepper
        db.insert("Pepper___bell___Bacterial_spot", record(
            "Bacterial Spot",
            "Apply copper-based bactericides. Remove infected plant parts.",
            "Use disease-free seeds. Rotate crops. Avoid overhead watering.",
            "Bacterial spot causes dark, water-soaked lesions on leaves and fruits.",
        ));
        db.insert("Pepper___bell___Healthy", record(
            "Healthy",
            "N/A",
            "Continue maintaining current care routine.",
            "Your pepper plant appears healthy.",
        ));

        // Corn
        db.insert("Corn___Common_rust", record(
            "Common Rust",
            "Apply fungicides containing propiconazole or azoxystrobin.",
            "Plant resistant varieties. Rotate crops. Ensure proper spacing.",
            "Common rust causes reddish-brown pustules on both sides of leaves.",
        ));
        db.insert("Corn___Northern_Leaf_Blight", record(
            "Northern Leaf Blight",
            "Apply fungicides containing chlorothalonil or mancozeb.",
            "Plant resistant varieties. Rotate crops. Remove crop debris.",
            "Northern leaf blight causes long, elliptical lesions on leaves.",
        ));

        // Apple
        db.insert("Apple___Apple_scab", record(
            "Apple Scab",
            "Apply fungicides containing captan or myclobutanil. Remove infected leaves.",
            "Plant resistant varieties. Prune for good air circulation. Remove fallen leaves.",
            "Apple scab causes dark, scaly lesions on leaves and fruits.",
        ));
        db.insert("Apple___Black_rot", record(
            "Black Rot",
            "Apply fungicides containing captan. Remove and destroy infected fruits and cankers.",
            "Prune to improve air circulation. Remove mummified fruits. Sanitize pruning tools.",
            "Black rot causes dark, sunken lesions on fruits and cankers on branches.",
        ));
        db.insert("Apple___Cedar_apple_rust", record(
            "Cedar Apple Rust",
            "Apply fungicides containing myclobutanil or propiconazole during bloom.",
            "Remove nearby cedar trees if possible. Plant resistant varieties.",
            "Cedar apple rust causes yellow-orange spots on leaves and fruits.",
        ));

        // Cherry
        db.insert("Cherry___Powdery_mildew", record(
            "Powdery Mildew",
            "Apply fungicides containing sulfur or myclobutanil. Prune for air circulation.",
            "Plant resistant varieties. Ensure good air circulation. Avoid overhead watering.",
            "Powdery mildew causes white, powdery coating on leaves and shoots.",
        ));

        // Grape
        db.insert("Grape___Black_rot", record(
            "Black Rot",
            "Apply fungicides containing mancozeb or captan. Remove infected fruits and leaves.",
            "Prune for good air circulation. Remove mummified fruits. Use resistant varieties.",
            "Black rot causes dark, sunken lesions on fruits and brown spots on leaves.",
        ));
        db.insert("Grape___Esca", record(
            "Esca (Black Measles)",
            "No effective cure. Remove severely infected vines. Apply preventive fungicides.",
            "Use disease-free planting material. Avoid wounding vines. Sanitize pruning tools.",
            "Esca causes leaf discoloration, wood decay, and fruit rot.",
        ));
        db.insert("Grape___Leaf_blight", record(
            "Leaf Blight",
            "Apply fungicides containing copper or mancozeb. Remove infected leaves.",
            "Prune for air circulation. Remove plant debris. Use resistant varieties.",
            "Leaf blight causes brown spots and premature leaf drop.",
        ));

        // Strawberry
        db.insert("Strawberry___Leaf_scorch", record(
            "Leaf Scorch",
            "Apply fungicides containing captan or thiophanate-methyl.",
            "Use disease-free plants. Ensure good air circulation. Remove old leaves.",
            "Leaf scorch causes purple spots on leaves that may turn brown.",
        ));

        // Peach
        db.insert("Peach___Bacterial_spot", record(
            "Bacterial Spot",
            "Apply copper-based bactericides. Prune infected branches.",
            "Use disease-free planting material. Prune for air circulation.",
            "Bacterial spot causes dark lesions on leaves, fruits, and twigs.",
        ));
        db
    };
}

/// Exact-key lookup.
pub fn lookup(key: &str) -> Option<&'static DiseaseRecord> {
    DISEASE_DATABASE.get(key)
}

pub fn healthy_record() -> DiseaseRecord {
    lookup(HEALTHY_KEY).copied().unwrap_or(record(
        "Healthy",
        "N/A",
        "Continue maintaining current care routine.",
        "Your plant appears healthy.",
    ))
}

pub fn len() -> usize {
    DISEASE_DATABASE.len()
}

/// Turns a class key into a display name: separators become spaces and each
/// word is title-cased (`"Foo___bar_baz"` becomes `"Foo Bar Baz"`).
pub fn humanize_key(key: &str) -> String {
    let spaced = key.replace("___", " ").replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut in_word = false;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
