use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use log::error;
use serde::Deserialize;
use serde_json::{json, Value};

use super::upload::read_image_upload;
use super::{ApiError, AppState};
use crate::chat::ChatReply;
use crate::diagnosis::{interpret, validate_plant as check_plant, Diagnosis, PlantCheck};
use crate::model::{InferenceResult, LoadedModel, ModelCache};
use crate::preprocess::image_bytes_to_input;

/// Loads the model if needed, then decodes and scores one image.
fn score_image(models: &ModelCache, bytes: &[u8]) -> Result<(Arc<LoadedModel>, InferenceResult), ApiError> {
    let model = models.get_or_load().map_err(|e| {
        error!("Model unavailable: {}", e);
        ApiError::from_load_error(e)
    })?;

    let input = image_bytes_to_input(bytes, model.target_size()).map_err(|e| {
        error!("Error processing image: {}", e);
        ApiError::bad_request("Image processing failed").with_details(e)
    })?;

    let result = model.infer(&input).map_err(|e| {
        error!("Prediction failed: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed").with_details(e)
    })?;

    Ok((model, result))
}

/// Runs `score_image` on the blocking pool so a first-request load does not stall the reactor.
async fn score_upload(state: &AppState, bytes: Vec<u8>) -> Result<(Arc<LoadedModel>, InferenceResult), ApiError> {
    let models = Arc::clone(&state.models);
    tokio::task::spawn_blocking(move || score_image(&models, &bytes))
        .await
        .map_err(ApiError::internal)?
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Diagnosis>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request("No file part"))?;
    let bytes = read_image_upload(&mut multipart, state.max_upload_mb).await?;

    let (model, result) = score_upload(&state, bytes).await?;
    Ok(Json(interpret(&result, model.class_names())))
}

pub async fn validate_plant(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PlantCheck>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request("No file part"))?;
    let bytes = read_image_upload(&mut multipart, state.max_upload_mb).await?;

    let (_, result) = score_upload(&state, bytes).await?;
    Ok(Json(check_plant(&result)))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

pub async fn chat(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let message = request
        .map(|Json(request)| request.message.trim().to_string())
        .unwrap_or_default();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }
    Ok(Json(state.chat.reply(&message).await))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model_loaded": state.models.is_loaded(),
    }))
}
