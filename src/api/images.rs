use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::api::validation::validate_id;
use crate::domain::ImageId;

/// GET /images/{id}
///
/// Raw image bytes. The original file name travels URL-encoded in a
/// `filename` header.
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let id = ImageId::new(validate_id("image", id)?);
    let image = state.catalog.get_image(id).await?;

    let content_type = HeaderValue::from_str(&image.content_type)
        .map_err(|e| ApiError::internal(format!("Stored content type is not a header: {e}")))?;
    let filename = HeaderValue::from_str(&urlencoding::encode(&image.original_filename))
        .map_err(|e| ApiError::internal(format!("Failed to encode file name: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, HeaderValue::from(image.bytes.len())),
            (header::HeaderName::from_static("filename"), filename),
        ],
        Body::from(image.bytes),
    )
        .into_response())
}
