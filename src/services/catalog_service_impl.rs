//! `SeaORM` implementation of the `CatalogService` trait.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::db::Store;
use crate::domain::{
    Image, ImageId, ImageUpload, NewImage, Product, ProductDetails, ProductId, UserId, invariants,
};
use crate::services::catalog_service::{CatalogError, CatalogService};

pub struct SeaOrmCatalogService {
    store: Store,
}

impl SeaOrmCatalogService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn load(&self, id: ProductId) -> Result<Product, CatalogError> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;

        invariants::check_product(&product)?;
        Ok(product)
    }

    fn check_all(products: Vec<Product>) -> Result<Vec<Product>, CatalogError> {
        for product in &products {
            invariants::check_product(product)?;
        }
        Ok(products)
    }
}

#[async_trait]
impl CatalogService for SeaOrmCatalogService {
    async fn list(&self, title_filter: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        // Blankness picks the path; the filter itself is matched as given.
        let products = match title_filter.filter(|t| !t.trim().is_empty()) {
            Some(needle) => self.store.find_products_by_title(needle).await?,
            None => self.store.list_products_by_created_desc().await?,
        };

        Self::check_all(products)
    }

    async fn create(
        &self,
        details: ProductDetails,
        owner: UserId,
        upload: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let details = details.normalized();
        details.validate()?;

        let new_images = match upload {
            Some(upload) => vec![NewImage::from_upload(upload)?.as_preview_candidate()],
            None => Vec::new(),
        };

        let txn = self.store.begin_product_write().await?;

        // Phase 1: the store assigns product and image ids.
        let mut draft = self
            .store
            .insert_product_with_images(
                &txn,
                &details,
                owner,
                &new_images,
                Utc::now().trunc_subsecs(6),
            )
            .await?;

        if draft.images.is_empty() {
            warn!(title = %details.title, "Product has no images, rolling back");
            return Err(CatalogError::MissingImage {
                title: details.title,
            });
        }

        // Phase 2: point the preview at the freshly assigned image id.
        if !draft.has_valid_preview() {
            let preview = new_images
                .iter()
                .position(|image| image.preview_candidate)
                .and_then(|index| draft.images.get(index))
                .or_else(|| draft.images.first())
                .map(|image| image.id)
                .ok_or_else(|| CatalogError::MissingImage {
                    title: details.title.clone(),
                })?;

            self.store
                .set_product_preview_image(&txn, draft.id, preview)
                .await?;
            draft.preview_image_id = Some(preview);
            debug!(product_id = %draft.id, image_id = %preview, "Assigned preview image");
        }

        // An inconsistent draft drops `txn` uncommitted.
        invariants::check_product(&draft)?;
        txn.commit().await?;

        let product = self.load(draft.id).await?;

        metrics::counter!("catalog_products_created_total").increment(1);
        info!(
            product_id = %product.id,
            title = %product.title,
            author = product.author.as_deref().unwrap_or("-"),
            "Created product"
        );

        Ok(product)
    }

    async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.load(id).await
    }

    async fn update(
        &self,
        id: ProductId,
        details: ProductDetails,
    ) -> Result<Product, CatalogError> {
        let current = self.load(id).await?;

        let details = details.normalized();
        details.validate()?;

        let merged = Product {
            title: details.title.clone(),
            description: details.description.clone(),
            price: details.price,
            genre: details.genre.clone(),
            author: details.author.clone(),
            ..current
        };
        invariants::check_product(&merged)?;

        self.store.update_product_details(id, &details).await?;

        let product = self.load(id).await?;
        info!(product_id = %id, title = %product.title, "Updated product");
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if !self.store.product_exists(id).await? {
            return Err(CatalogError::ProductNotFound(id));
        }

        let image_ids = self.store.image_ids_for_product(id).await?;

        // Raced with another delete between the check and here.
        let Some(removed_images) = self.store.delete_product_with_images(id).await? else {
            return Err(CatalogError::ProductNotFound(id));
        };

        metrics::counter!("catalog_products_deleted_total").increment(1);
        info!(
            product_id = %id,
            images = removed_images,
            image_ids = ?image_ids,
            "Deleted product"
        );

        Ok(())
    }

    async fn get_image(&self, id: ImageId) -> Result<Image, CatalogError> {
        let image = self
            .store
            .get_image(id)
            .await?
            .ok_or(CatalogError::ImageNotFound(id))?;

        invariants::check_image(&image)?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::entities::products;
    use sea_orm::{ConnectionTrait, EntityTrait};

    async fn setup() -> (SeaOrmCatalogService, UserId) {
        let path = std::env::temp_dir().join(format!(
            "vitrine-catalog-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = Store::new(&format!("sqlite:{}", path.display()))
            .await
            .expect("failed to open store");
        let owner = store
            .insert_user("owner", "$argon2id$stub", &[Role::standard()], Utc::now())
            .await
            .unwrap();

        (SeaOrmCatalogService::new(store), owner.id)
    }

    fn details(title: &str, price: f64) -> ProductDetails {
        ProductDetails {
            title: title.to_string(),
            description: Some("A fine book".to_string()),
            price,
            genre: Some("Novel".to_string()),
            author: Some("Someone".to_string()),
        }
    }

    fn upload(content_type: &str) -> ImageUpload {
        let bytes = vec![0x89, b'P', b'N', b'G', 1, 2, 3];
        ImageUpload {
            field_name: "file1".to_string(),
            declared_content_type: Some(content_type.to_string()),
            original_filename: "cover.png".to_string(),
            declared_size: i64::try_from(bytes.len()).unwrap(),
            bytes,
        }
    }

    #[tokio::test]
    async fn create_assigns_the_uploaded_image_as_preview() {
        let (catalog, owner) = setup().await;

        let product = catalog
            .create(details("Dune", 12.5), owner, Some(upload("image/png")))
            .await
            .unwrap();

        assert_eq!(product.images.len(), 1);
        assert_eq!(product.preview_image_id, Some(product.images[0].id));
        assert_eq!(product.owner, owner);

        let fetched = catalog.get(product.id).await.unwrap();
        assert_eq!(fetched, product);

        let image = catalog.get_image(product.images[0].id).await.unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.original_filename, "cover.png");
        assert_eq!(image.size, 7);
        assert_eq!(image.product_id, product.id);
    }

    #[tokio::test]
    async fn non_positive_prices_are_rejected() {
        let (catalog, owner) = setup().await;

        for price in [0.0, -1.0, f64::NAN] {
            let err = catalog
                .create(details("Free", price), owner, Some(upload("image/png")))
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)), "{price}");
        }

        let product = catalog
            .create(details("Paid", 1.0), owner, Some(upload("image/png")))
            .await
            .unwrap();
        let err = catalog
            .update(product.id, details("Paid", 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        assert_eq!(catalog.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_image_upload_fails_before_anything_is_written() {
        let (catalog, owner) = setup().await;

        let err = catalog
            .create(details("Notes", 3.0), owner, Some(upload("text/plain")))
            .await
            .unwrap_err();

        match err {
            CatalogError::Validation(e) => assert_eq!(e.field, "content_type"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(catalog.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_without_image_is_rolled_back() {
        let (catalog, owner) = setup().await;

        let err = catalog
            .create(details("Bare", 3.0), owner, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::MissingImage { ref title } if title == "Bare"));
        assert!(catalog.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_changes_fields_but_not_images() {
        let (catalog, owner) = setup().await;
        let created = catalog
            .create(details("Old title", 5.0), owner, Some(upload("image/jpeg")))
            .await
            .unwrap();

        let updated = catalog
            .update(
                created.id,
                ProductDetails {
                    title: "New title".to_string(),
                    description: Some("   ".to_string()),
                    price: 7.25,
                    genre: None,
                    author: Some("Other".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description, None);
        assert!((updated.price - 7.25).abs() < f64::EPSILON);
        assert_eq!(updated.genre, None);
        assert_eq!(updated.author.as_deref(), Some("Other"));
        assert_eq!(updated.images, created.images);
        assert_eq!(updated.preview_image_id, created.preview_image_id);
        assert_eq!(updated.date_of_created, created.date_of_created);
    }

    #[tokio::test]
    async fn delete_removes_product_and_its_images() {
        let (catalog, owner) = setup().await;
        let product = catalog
            .create(details("Doomed", 2.0), owner, Some(upload("image/gif")))
            .await
            .unwrap();
        let image_id = product.images[0].id;

        catalog.delete(product.id).await.unwrap();

        assert!(matches!(
            catalog.get(product.id).await,
            Err(CatalogError::ProductNotFound(id)) if id == product.id
        ));
        assert!(matches!(
            catalog.get_image(image_id).await,
            Err(CatalogError::ImageNotFound(id)) if id == image_id
        ));
        assert!(matches!(
            catalog.delete(product.id).await,
            Err(CatalogError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let (catalog, _) = setup().await;

        assert!(catalog.get(ProductId::new(404)).await.unwrap_err().is_not_found());
        assert!(
            catalog
                .update(ProductId::new(404), details("x", 1.0))
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(catalog.delete(ProductId::new(404)).await.unwrap_err().is_not_found());
        assert!(catalog.get_image(ImageId::new(404)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn list_filters_by_title_ignoring_case() {
        let (catalog, owner) = setup().await;
        for title in ["The ABC Murders", "abc of Cooking", "Dune"] {
            catalog
                .create(details(title, 1.0), owner, Some(upload("image/png")))
                .await
                .unwrap();
        }

        let mut found: Vec<String> = catalog
            .list(Some("aBc"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        found.sort();
        assert_eq!(found, vec!["The ABC Murders", "abc of Cooking"]);

        assert_eq!(catalog.list(None).await.unwrap().len(), 3);
        assert_eq!(catalog.list(Some("")).await.unwrap().len(), 3);
        assert_eq!(catalog.list(Some("   ")).await.unwrap().len(), 3);
        assert!(catalog.list(Some("zzz")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let (catalog, owner) = setup().await;
        for title in ["first", "second", "third"] {
            catalog
                .create(details(title, 1.0), owner, Some(upload("image/png")))
                .await
                .unwrap();
        }

        let titles: Vec<String> = catalog
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn title_filter_is_matched_without_trimming() {
        let (catalog, owner) = setup().await;
        for title in ["abcdef", "The abc"] {
            catalog
                .create(details(title, 1.0), owner, Some(upload("image/png")))
                .await
                .unwrap();
        }

        let found: Vec<String> = catalog
            .list(Some(" abc"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(found, vec!["The abc"]);
    }

    #[tokio::test]
    async fn inconsistent_draft_is_not_committed() {
        let (catalog, _) = setup().await;
        catalog
            .store
            .conn
            .execute_unprepared(
                "INSERT INTO users (id, username, password_hash, created_at) \
                 VALUES (0, 'ghost', '$argon2id$stub', '2026-01-01T00:00:00+00:00')",
            )
            .await
            .unwrap();

        let err = catalog
            .create(details("Orphan", 4.0), UserId::new(0), Some(upload("image/png")))
            .await
            .unwrap_err();

        match err {
            CatalogError::Consistency(v) => assert_eq!(v.field, "user"),
            other => panic!("expected consistency violation, got {other:?}"),
        }
        let rows = products::Entity::find()
            .all(&catalog.store.conn)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn update_of_inconsistent_product_writes_nothing() {
        let (catalog, owner) = setup().await;
        let product = catalog
            .create(details("Kept", 5.0), owner, Some(upload("image/png")))
            .await
            .unwrap();
        catalog
            .store
            .conn
            .execute_unprepared(&format!(
                "UPDATE products SET preview_image_id = 9999 WHERE id = {}",
                product.id
            ))
            .await
            .unwrap();

        let err = catalog
            .update(product.id, details("Changed", 6.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Consistency(_)));

        let row = products::Entity::find_by_id(product.id.value())
            .one(&catalog.store.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.title, "Kept");
    }

    #[tokio::test]
    async fn corrupted_rows_surface_as_consistency_errors() {
        let (catalog, owner) = setup().await;
        let product = catalog
            .create(details("Tampered", 5.0), owner, Some(upload("image/png")))
            .await
            .unwrap();
        let image_id = product.images[0].id;

        catalog
            .store
            .conn
            .execute_unprepared(&format!(
                "UPDATE products SET preview_image_id = 9999 WHERE id = {}",
                product.id
            ))
            .await
            .unwrap();
        match catalog.get(product.id).await {
            Err(CatalogError::Consistency(v)) => assert_eq!(v.field, "preview_image_id"),
            other => panic!("expected consistency violation, got {other:?}"),
        }

        catalog
            .store
            .conn
            .execute_unprepared(&format!(
                "UPDATE products SET preview_image_id = {image_id} WHERE id = {}",
                product.id
            ))
            .await
            .unwrap();
        catalog
            .store
            .conn
            .execute_unprepared(&format!(
                "UPDATE images SET content_type = 'text/plain' WHERE id = {image_id}"
            ))
            .await
            .unwrap();
        match catalog.list(None).await {
            Err(CatalogError::Consistency(v)) => assert_eq!(v.field, "content_type"),
            other => panic!("expected consistency violation, got {other:?}"),
        }
        match catalog.get_image(image_id).await {
            Err(CatalogError::Consistency(v)) => assert_eq!(v.field, "content_type"),
            other => panic!("expected consistency violation, got {other:?}"),
        }
    }
}
