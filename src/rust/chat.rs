//! Agriculture-only assistant backed by the Gemini `generateContent` API.
//!
//! Questions that mention none of [`AGRICULTURE_KEYWORDS`] get a canned
//! redirect and never reach the backend.

use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

pub const AGRICULTURE_KEYWORDS: &[&str] = &[
    "crop", "plant", "farming", "farmer", "agriculture", "agricultural", "harvest",
    "seed", "fertilizer", "pesticide", "irrigation", "soil", "disease", "pest",
    "yield", "cultivation", "sowing", "weather", "rainfall", "drought", "flood",
    "scheme", "subsidy", "loan", "credit", "insurance", "market", "price",
    "vegetable", "fruit", "grain", "wheat", "rice", "corn", "tomato", "potato",
    "organic", "compost", "manure", "weed", "blight", "rust", "mildew",
    "livestock", "cattle", "dairy", "poultry", "fishery", "aquaculture",
];

pub const OFF_TOPIC_REPLY: &str = "I'm an agriculture-focused assistant. Please ask me questions related to farming, crops, plant diseases, government schemes, or agricultural practices. How can I help you with agriculture today?";

pub const APOLOGY_REPLY: &str = "I apologize, but I'm having trouble processing your request right now. Please try again or rephrase your agriculture-related question.";

pub const SYSTEM_PROMPT: &str = "You are an expert agriculture assistant for AgroVision, a platform helping farmers with plant disease detection and agricultural guidance.

Your role is to:
- Provide accurate information about crops, farming practices, and agricultural techniques
- Help with plant disease identification and treatment
- Guide farmers on government schemes and subsidies
- Offer advice on soil health, irrigation, and crop management
- Answer questions about organic farming, pesticides, and fertilizers
- Provide information about market prices and agricultural economics

Keep responses:
- Clear, concise, and practical
- Focused on Indian agriculture context when relevant
- Helpful and supportive
- Based on scientific agricultural knowledge

If asked about non-agriculture topics, politely redirect to agriculture-related questions.";

/// Case-insensitive substring match against [`AGRICULTURE_KEYWORDS`].
pub fn is_agriculture_query(message: &str) -> bool {
    let lower = message.to_lowercase();
    AGRICULTURE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

pub fn build_prompt(message: &str) -> String {
    format!("{}\n\nUser Question: {}\n\nAssistant Response:", SYSTEM_PROMPT, message)
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Backend returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Backend response contained no text")]
    EmptyResponse,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Minimal client for `POST /v1beta/models/{model}:generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` and returns the first candidate's text, trimmed.
    pub async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChatError::Status(response.status()));
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ChatError::EmptyResponse)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub is_agriculture: bool,
}

/// Keyword gate in front of an optional [`GeminiClient`].
#[derive(Debug, Clone, Default)]
pub struct ChatService {
    client: Option<GeminiClient>,
}

impl ChatService {
    pub fn new(client: Option<GeminiClient>) -> Self {
        Self { client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Answers `message`. Backend failures degrade to [`APOLOGY_REPLY`] rather than an error.
    pub async fn reply(&self, message: &str) -> ChatReply {
        if !is_agriculture_query(message) {
            info!("Chat message rejected as off-topic");
            return ChatReply {
                response: OFF_TOPIC_REPLY.to_string(),
                is_agriculture: false,
            };
        }

        let response = match &self.client {
            Some(client) => match client.generate(&build_prompt(message)).await {
                Ok(text) => text,
                Err(e) => {
                    error!("Gemini API error: {}", e);
                    APOLOGY_REPLY.to_string()
                }
            },
            None => {
                warn!("No Gemini API key configured; returning fallback reply");
                APOLOGY_REPLY.to_string()
            }
        };

        ChatReply {
            response,
            is_agriculture: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_gate() {
        assert!(is_agriculture_query("How do I treat TOMATO blight?"));
        assert!(is_agriculture_query("Any subsidy for drip irrigation?"));
        assert!(!is_agriculture_query("Who won the football match?"));
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("When to sow wheat?");
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.ends_with("\n\nUser Question: When to sow wheat?\n\nAssistant Response:"));
    }

    #[test]
    fn test_off_topic_never_needs_backend() {
        let reply = tokio_test::block_on(ChatService::default().reply("tell me a joke"));
        assert!(!reply.is_agriculture);
        assert_eq!(reply.response, OFF_TOPIC_REPLY);
    }

    #[tokio::test]
    async fn test_unconfigured_backend_apologises() {
        let reply = ChatService::default().reply("best fertilizer for rice?").await;
        assert!(reply.is_agriculture);
        assert_eq!(reply.response, APOLOGY_REPLY);
    }
}
