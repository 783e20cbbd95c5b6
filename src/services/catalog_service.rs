//! Domain service for the product catalog.

use thiserror::Error;

use crate::domain::{
    ConsistencyViolation, Image, ImageId, ImageUpload, Product, ProductDetails, ProductId, UserId,
    ValidationError,
};

/// Errors specific to catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Image {0} not found")]
    ImageNotFound(ImageId),

    /// Creation finished its first write without any image attached.
    #[error("Product '{title}' must have at least one image")]
    MissingImage { title: String },

    #[error(transparent)]
    Consistency(#[from] ConsistencyViolation),

    #[error("Database error: {0}")]
    Database(String),
}

impl CatalogError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ProductNotFound(_) | Self::ImageNotFound(_))
    }
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// Domain service trait for catalog management.
///
/// Every product returned has passed the aggregate's consistency checks.
#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    /// Lists products, newest first.
    ///
    /// A non-blank `title_filter` keeps only titles containing it, ignoring
    /// case. `None` or a blank filter returns everything.
    async fn list(&self, title_filter: Option<&str>) -> Result<Vec<Product>, CatalogError>;

    /// Creates a product owned by `owner`, attaching `upload` as its preview.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] for a bad title or price, or an upload
    ///   whose declared content type is not `image/*`. Nothing is written.
    /// - [`CatalogError::MissingImage`] if no image was supplied. The partial
    ///   write is rolled back.
    async fn create(
        &self,
        details: ProductDetails,
        owner: UserId,
        upload: Option<ImageUpload>,
    ) -> Result<Product, CatalogError>;

    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] if the id does not resolve.
    async fn get(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Replaces the scalar fields. Images and the preview are left alone.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::ProductNotFound`] if the id does not resolve
    /// - [`CatalogError::Validation`] for a bad title or price
    async fn update(
        &self,
        id: ProductId,
        details: ProductDetails,
    ) -> Result<Product, CatalogError>;

    /// Removes the product and every image it owns.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] if the id does not resolve.
    async fn delete(&self, id: ProductId) -> Result<(), CatalogError>;

    /// # Errors
    ///
    /// Returns [`CatalogError::ImageNotFound`] if the id does not resolve.
    async fn get_image(&self, id: ImageId) -> Result<Image, CatalogError>;
}
