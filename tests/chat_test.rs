use std::sync::{Arc, Mutex};

use agrovision::chat::{build_prompt, ChatService, GeminiClient, APOLOGY_REPLY};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn generate(
    State(seen): State<Seen>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.requests.lock().unwrap().push((model_action, key, body));
    Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": "  Rotate crops and use resistant varieties.\n" }] } }]
    }))
}

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_agriculture_question_reaches_backend() {
    let seen = Seen::default();
    let backend = Router::new()
        .route("/v1beta/models/:model_action", post(generate))
        .with_state(seen.clone());
    let base = spawn_backend(backend).await;

    let client = GeminiClient::new("test-key", "gemini-test").with_base_url(base);
    let reply = ChatService::new(Some(client)).reply("How do I stop potato blight?").await;

    assert!(reply.is_agriculture);
    assert_eq!(reply.response, "Rotate crops and use resistant varieties.");

    let requests = seen.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (model_action, key, body) = &requests[0];
    assert_eq!(model_action, "gemini-test:generateContent");
    assert_eq!(key.as_deref(), Some("test-key"));
    assert_eq!(
        body["contents"][0]["parts"][0]["text"],
        json!(build_prompt("How do I stop potato blight?"))
    );
}

#[tokio::test]
async fn test_backend_error_yields_apology() {
    let backend = Router::new().route(
        "/v1beta/models/:model_action",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn_backend(backend).await;

    let client = GeminiClient::new("test-key", "gemini-test").with_base_url(base);
    let reply = ChatService::new(Some(client)).reply("fertilizer for wheat").await;

    assert!(reply.is_agriculture);
    assert_eq!(reply.response, APOLOGY_REPLY);
}

#[tokio::test]
async fn test_off_topic_question_never_reaches_backend() {
    let seen = Seen::default();
    let backend = Router::new()
        .route("/v1beta/models/:model_action", post(generate))
        .with_state(seen.clone());
    let base = spawn_backend(backend).await;

    let client = GeminiClient::new("test-key", "gemini-test").with_base_url(base);
    let reply = ChatService::new(Some(client)).reply("Recommend a good movie").await;

    assert!(!reply.is_agriculture);
    assert!(seen.requests.lock().unwrap().is_empty());
}
