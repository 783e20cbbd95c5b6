use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    LoaderTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::{Image, ImageId, NewImage, Product, ProductDetails, ProductId, UserId};
use crate::entities::{images, prelude::*, products};

pub(crate) fn image_from_model(model: images::Model) -> Image {
    Image {
        id: ImageId::new(model.id),
        product_id: ProductId::new(model.product_id),
        name: model.name,
        original_filename: model.original_filename,
        content_type: model.content_type,
        size: model.size,
        bytes: model.bytes,
    }
}

fn product_from_rows(model: products::Model, mut images: Vec<images::Model>) -> Product {
    images.sort_by_key(|image| image.id);

    Product {
        id: ProductId::new(model.id),
        title: model.title,
        description: model.description,
        price: model.price,
        genre: model.genre,
        author: model.author,
        date_of_created: model.date_of_created,
        images: images.into_iter().map(image_from_model).collect(),
        preview_image_id: model.preview_image_id.map(ImageId::new),
        owner: UserId::new(model.user_id),
    }
}

pub struct ProductRepository {
    conn: DatabaseConnection,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Opens a transaction for multi-step writes such as the create sequence.
    /// Dropping it without `commit` rolls everything back.
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        self.conn
            .begin()
            .await
            .context("Failed to open product transaction")
    }

    /// Persist a product and its images so the store assigns ids.
    pub async fn insert_with_images(
        &self,
        txn: &DatabaseTransaction,
        details: &ProductDetails,
        owner: UserId,
        new_images: &[NewImage],
        date_of_created: DateTime<Utc>,
    ) -> Result<Product> {
        let product = products::ActiveModel {
            title: Set(details.title.clone()),
            description: Set(details.description.clone()),
            price: Set(details.price),
            genre: Set(details.genre.clone()),
            author: Set(details.author.clone()),
            preview_image_id: Set(None),
            date_of_created: Set(date_of_created),
            user_id: Set(owner.value()),
            ..Default::default()
        }
        .insert(txn)
        .await
        .context("Failed to insert product")?;

        // One insert per image keeps the assigned ids in upload order.
        let mut stored = Vec::with_capacity(new_images.len());
        for image in new_images {
            let model = images::ActiveModel {
                product_id: Set(product.id),
                name: Set(image.name.clone()),
                original_filename: Set(image.original_filename.clone()),
                content_type: Set(image.content_type.clone()),
                size: Set(image.size),
                bytes: Set(image.bytes.clone()),
                ..Default::default()
            }
            .insert(txn)
            .await
            .context("Failed to insert product image")?;
            stored.push(model);
        }

        Ok(product_from_rows(product, stored))
    }

    pub async fn set_preview_image(
        &self,
        txn: &DatabaseTransaction,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<()> {
        products::ActiveModel {
            id: Set(product_id.value()),
            preview_image_id: Set(Some(image_id.value())),
            ..Default::default()
        }
        .update(txn)
        .await
        .with_context(|| format!("Failed to set preview image for product {product_id}"))?;

        Ok(())
    }

    pub async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        let Some(product) = Products::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query product by ID")?
        else {
            return Ok(None);
        };

        let images = product
            .find_related(Images)
            .all(&self.conn)
            .await
            .context("Failed to load product images")?;

        Ok(Some(product_from_rows(product, images)))
    }

    pub async fn exists(&self, id: ProductId) -> Result<bool> {
        let count = Products::find_by_id(id.value())
            .count(&self.conn)
            .await
            .context("Failed to check product existence")?;

        Ok(count > 0)
    }

    /// Writes only the scalar columns; images and the preview reference are
    /// left as stored.
    pub async fn update_details(&self, id: ProductId, details: &ProductDetails) -> Result<()> {
        products::ActiveModel {
            id: Set(id.value()),
            title: Set(details.title.clone()),
            description: Set(details.description.clone()),
            price: Set(details.price),
            genre: Set(details.genre.clone()),
            author: Set(details.author.clone()),
            ..Default::default()
        }
        .update(&self.conn)
        .await
        .with_context(|| format!("Failed to update product {id}"))?;

        Ok(())
    }

    /// Removes the product's images and then the product, in one transaction.
    /// Returns the number of images removed, or `None` if the product row was
    /// already gone.
    pub async fn delete_with_images(&self, id: ProductId) -> Result<Option<u64>> {
        let txn = self.begin().await?;

        let removed_images = Images::delete_many()
            .filter(images::Column::ProductId.eq(id.value()))
            .exec(&txn)
            .await
            .with_context(|| format!("Failed to delete images of product {id}"))?
            .rows_affected;

        let removed = Products::delete_by_id(id.value())
            .exec(&txn)
            .await
            .with_context(|| format!("Failed to delete product {id}"))?
            .rows_affected;

        if removed == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        txn.commit().await?;
        Ok(Some(removed_images))
    }

    /// All products, newest first.
    pub async fn list_by_created_desc(&self) -> Result<Vec<Product>> {
        let rows = Products::find()
            .order_by_desc(products::Column::DateOfCreated)
            .order_by_desc(products::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list products")?;

        self.with_images(rows).await
    }

    /// Products whose title contains `needle`, ignoring case, newest first.
    pub async fn find_by_title(&self, needle: &str) -> Result<Vec<Product>> {
        // SQLite's LIKE and lower() only fold ASCII, so the match runs here.
        let needle = needle.to_lowercase();

        let rows: Vec<products::Model> = Products::find()
            .order_by_desc(products::Column::DateOfCreated)
            .order_by_desc(products::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query products by title")?
            .into_iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .collect();

        self.with_images(rows).await
    }

    async fn with_images(&self, rows: Vec<products::Model>) -> Result<Vec<Product>> {
        let images = rows
            .load_many(Images, &self.conn)
            .await
            .context("Failed to load product images")?;

        Ok(rows
            .into_iter()
            .zip(images)
            .map(|(product, images)| product_from_rows(product, images))
            .collect())
    }
}
