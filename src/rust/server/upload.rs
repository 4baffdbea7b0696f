use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use super::ApiError;

/// Form field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// True when `filename` has one of [`ALLOWED_EXTENSIONS`] (case-insensitive).
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn multipart_error(err: MultipartError, max_upload_mb: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, format!("File too large (Max {}MB)", max_upload_mb))
    } else {
        ApiError::bad_request("Invalid upload").with_details(err.body_text())
    }
}

/// Pulls the bytes of the `image` field out of a multipart body.
pub async fn read_image_upload(multipart: &mut Multipart, max_upload_mb: usize) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_upload_mb))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }
        if !allowed_file(&filename) {
            return Err(ApiError::bad_request("Invalid file type. Use JPG/PNG."));
        }

        let bytes = field.bytes().await.map_err(|e| multipart_error(e, max_upload_mb))?;
        log::debug!("Received upload {:?} ({} bytes)", filename, bytes.len());
        return Ok(bytes.to_vec());
    }

    Err(ApiError::bad_request("No file part"))
}
