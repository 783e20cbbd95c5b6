use serde::Serialize;

use crate::domain::{Image, Product};
use crate::policy::{Principal, SessionUser};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Image metadata; the bytes are served separately from `/images/{id}`.
#[derive(Debug, Serialize)]
pub struct ImageDto {
    pub id: i64,
    pub name: String,
    pub original_filename: String,
    pub content_type: String,
    pub size: i64,
    pub url: String,
}

impl From<&Image> for ImageDto {
    fn from(image: &Image) -> Self {
        Self {
            id: image.id.value(),
            name: image.name.clone(),
            original_filename: image.original_filename.clone(),
            content_type: image.content_type.clone(),
            size: image.size,
            url: format!("/images/{}", image.id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductDto {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub date_of_created: String,
    pub preview_image_id: Option<i64>,
    pub owner_id: i64,
    pub images: Vec<ImageDto>,
}

impl From<&Product> for ProductDto {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.value(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            genre: product.genre.clone(),
            author: product.author.clone(),
            date_of_created: product.date_of_created.to_rfc3339(),
            preview_image_id: product.preview_image_id.map(|id| id.value()),
            owner_id: product.owner.value(),
            images: product.images.iter().map(ImageDto::from).collect(),
        }
    }
}

/// Flags for the login and registration surfaces.
#[derive(Debug, Serialize)]
pub struct SurfaceDto {
    pub surface: &'static str,
    pub error: bool,
    pub logout: bool,
}

#[derive(Debug, Serialize)]
pub struct PrincipalDto {
    pub user_id: i64,
    pub username: String,
    pub authorities: Vec<String>,
}

impl From<&SessionUser> for PrincipalDto {
    fn from(user: &SessionUser) -> Self {
        Self {
            user_id: user.user_id.value(),
            username: user.username.clone(),
            authorities: user.authorities(),
        }
    }
}
