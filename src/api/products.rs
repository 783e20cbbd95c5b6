use axum::{
    Extension, Form, Json,
    extract::{Multipart, Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ProductDto};
use crate::api::validation::{parse_price, validate_id};
use crate::domain::{ImageUpload, ProductDetails, ProductId};
use crate::policy::{LANDING_PATH, SessionUser};
use crate::services::CatalogError;

/// Multipart field carrying the product image.
const IMAGE_FIELD: &str = "file1";

#[derive(Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ProductForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub author: String,
}

impl ProductForm {
    fn into_details(self) -> Result<ProductDetails, ApiError> {
        Ok(ProductDetails {
            price: parse_price(&self.price)?,
            title: self.title,
            description: Some(self.description),
            genre: Some(self.genre),
            author: Some(self.author),
        })
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(e) => Self::validation(e.to_string()),
            CatalogError::ProductNotFound(id) => Self::not_found("Product", id),
            CatalogError::ImageNotFound(id) => Self::not_found("Image", id),
            e @ CatalogError::MissingImage { .. } => Self::validation(e.to_string()),
            CatalogError::Consistency(e) => Self::internal(e.to_string()),
            CatalogError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

/// GET /?title=
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<ProductDto>>>, ApiError> {
    let products = state.catalog.list(query.title.as_deref()).await?;
    Ok(Json(ApiResponse::success(
        products.iter().map(ProductDto::from).collect(),
    )))
}

/// GET /product/{id}
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    let id = ProductId::new(validate_id("product", id)?);
    let product = state.catalog.get(id).await?;
    Ok(Json(ApiResponse::success(ProductDto::from(&product))))
}

/// GET /product/edit/{id}
/// Same payload as the detail view; the client renders it as a form.
pub async fn edit_product(
    state: State<Arc<AppState>>,
    id: Path<i64>,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    get_product(state, id).await
}

/// POST /product/create
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let mut form = ProductForm::default();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            let original_filename = field.file_name().unwrap_or_default().to_string();
            let declared_content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;

            // An empty file input still arrives as a field.
            if original_filename.is_empty() && bytes.is_empty() {
                continue;
            }

            upload = Some(ImageUpload {
                field_name: name,
                declared_content_type,
                original_filename,
                declared_size: i64::try_from(bytes.len())
                    .map_err(|_| ApiError::validation("Upload is too large"))?,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read field '{name}': {e}")))?;

        match name.as_str() {
            "title" => form.title = value,
            "description" => form.description = value,
            "price" => form.price = value,
            "genre" => form.genre = value,
            "author" => form.author = value,
            _ => {}
        }
    }

    state
        .catalog
        .create(form.into_details()?, user.user_id, upload)
        .await?;

    Ok(Redirect::to(LANDING_PATH))
}

/// POST /product/update/{id}
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<ProductForm>,
) -> Result<Redirect, ApiError> {
    let id = ProductId::new(validate_id("product", id)?);
    state.catalog.update(id, form.into_details()?).await?;

    Ok(Redirect::to(&format!("/product/{id}")))
}

/// POST /product/delete/{id}
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    let id = ProductId::new(validate_id("product", id)?);
    state.catalog.delete(id).await?;

    Ok(Redirect::to(LANDING_PATH))
}
