use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use super::product::image_from_model;
use crate::domain::{Image, ImageId, ProductId};
use crate::entities::{images, prelude::*};

/// Read-only access; images are written and removed only through their product.
pub struct ImageRepository {
    conn: DatabaseConnection,
}

impl ImageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: ImageId) -> Result<Option<Image>> {
        let image = Images::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query image by ID")?;

        Ok(image.map(image_from_model))
    }

    pub async fn ids_for_product(&self, product_id: ProductId) -> Result<Vec<ImageId>> {
        let ids: Vec<i64> = Images::find()
            .select_only()
            .column(images::Column::Id)
            .filter(images::Column::ProductId.eq(product_id.value()))
            .order_by_asc(images::Column::Id)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to list image ids for product")?;

        Ok(ids.into_iter().map(ImageId::new).collect())
    }
}
