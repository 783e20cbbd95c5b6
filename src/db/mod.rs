use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{
    Image, ImageId, NewImage, Product, ProductDetails, ProductId, Role, User, UserId,
};

pub mod migrator;
pub mod repositories;

/// The storage collaborator: every catalog and credential read or write goes
/// through here.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        if !path_str.starts_with(":memory:") {
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn product_repo(&self) -> repositories::product::ProductRepository {
        repositories::product::ProductRepository::new(self.conn.clone())
    }

    fn image_repo(&self) -> repositories::image::ImageRepository {
        repositories::image::ImageRepository::new(self.conn.clone())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[Role],
        created_at: DateTime<Utc>,
    ) -> Result<User> {
        self.user_repo()
            .insert(username, password_hash, roles, created_at)
            .await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn user_exists(&self, username: &str) -> Result<bool> {
        self.user_repo().exists_by_username(username).await
    }

    pub async fn delete_user_by_username(&self, username: &str) -> Result<u64> {
        self.user_repo().delete_by_username(username).await
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn begin_product_write(&self) -> Result<DatabaseTransaction> {
        self.product_repo().begin().await
    }

    pub async fn insert_product_with_images(
        &self,
        txn: &DatabaseTransaction,
        details: &ProductDetails,
        owner: UserId,
        images: &[NewImage],
        date_of_created: DateTime<Utc>,
    ) -> Result<Product> {
        self.product_repo()
            .insert_with_images(txn, details, owner, images, date_of_created)
            .await
    }

    pub async fn set_product_preview_image(
        &self,
        txn: &DatabaseTransaction,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<()> {
        self.product_repo()
            .set_preview_image(txn, product_id, image_id)
            .await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        self.product_repo().get(id).await
    }

    pub async fn product_exists(&self, id: ProductId) -> Result<bool> {
        self.product_repo().exists(id).await
    }

    pub async fn update_product_details(
        &self,
        id: ProductId,
        details: &ProductDetails,
    ) -> Result<()> {
        self.product_repo().update_details(id, details).await
    }

    pub async fn delete_product_with_images(&self, id: ProductId) -> Result<Option<u64>> {
        self.product_repo().delete_with_images(id).await
    }

    pub async fn list_products_by_created_desc(&self) -> Result<Vec<Product>> {
        self.product_repo().list_by_created_desc().await
    }

    pub async fn find_products_by_title(&self, needle: &str) -> Result<Vec<Product>> {
        self.product_repo().find_by_title(needle).await
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    pub async fn get_image(&self, id: ImageId) -> Result<Option<Image>> {
        self.image_repo().get(id).await
    }

    pub async fn image_ids_for_product(&self, product_id: ProductId) -> Result<Vec<ImageId>> {
        self.image_repo().ids_for_product(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    async fn temp_store() -> Store {
        let path = std::env::temp_dir().join(format!("vitrine-db-test-{}.db", uuid::Uuid::new_v4()));
        Store::new(&format!("sqlite:{}", path.display()))
            .await
            .expect("failed to open store")
    }

    fn png(bytes: &[u8]) -> NewImage {
        NewImage {
            name: "file1".to_string(),
            original_filename: "a.png".to_string(),
            content_type: "image/png".to_string(),
            size: i64::try_from(bytes.len()).unwrap(),
            bytes: bytes.to_vec(),
            preview_candidate: true,
        }
    }

    fn details(title: &str) -> ProductDetails {
        ProductDetails {
            title: title.to_string(),
            price: 5.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_by_the_store() {
        let store = temp_store().await;
        let roles = [Role::standard()];

        store
            .insert_user("alice", "hash", &roles, Utc::now())
            .await
            .unwrap();
        assert!(store.insert_user("alice", "hash2", &roles, Utc::now()).await.is_err());

        // Exact match only.
        assert!(store.user_exists("alice").await.unwrap());
        assert!(!store.user_exists("Alice").await.unwrap());

        let loaded = store.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(loaded.roles, vec![Role::standard()]);

        assert_eq!(store.delete_user_by_username("alice").await.unwrap(), 1);
        assert!(store.get_user_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_nothing_behind() {
        let store = temp_store().await;
        let owner = store
            .insert_user("owner", "hash", &[Role::standard()], Utc::now())
            .await
            .unwrap();

        let product_id = {
            let txn = store.begin_product_write().await.unwrap();
            let product = store
                .insert_product_with_images(&txn, &details("Ghost"), owner.id, &[png(b"x")], Utc::now())
                .await
                .unwrap();
            product.id
        };

        assert!(!store.product_exists(product_id).await.unwrap());
        assert!(store.list_products_by_created_desc().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn title_search_folds_non_ascii_case() {
        let store = temp_store().await;
        let owner = store
            .insert_user("owner", "hash", &[Role::standard()], Utc::now())
            .await
            .unwrap();

        for title in ["Мастер и Маргарита", "Dune"] {
            let txn = store.begin_product_write().await.unwrap();
            store
                .insert_product_with_images(&txn, &details(title), owner.id, &[png(b"x")], Utc::now())
                .await
                .unwrap();
            txn.commit().await.unwrap();
        }

        let found = store.find_products_by_title("маргарита").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Мастер и Маргарита");
        assert_eq!(found[0].images.len(), 1);
    }
}
