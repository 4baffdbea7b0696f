//! HTTP API.
//!
//! | Route | |
//! |---|---|
//! | `POST /predict` | multipart `image` → [`Diagnosis`](crate::diagnosis::Diagnosis) |
//! | `POST /validate-plant` | multipart `image` → [`PlantCheck`](crate::diagnosis::PlantCheck) |
//! | `POST /api/chat` | `{"message": ...}` → [`ChatReply`](crate::chat::ChatReply) |
//! | `GET /health` | `{"status": "ok", "model_loaded": bool}` |

mod error;
pub mod routes;
mod state;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

pub use error::ApiError;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes();
    Router::new()
        .route("/predict", post(routes::predict))
        .route("/validate-plant", post(routes::validate_plant))
        .route("/api/chat", post(routes::chat))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
