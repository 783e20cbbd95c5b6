use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::{Role, User, UserId};
use crate::entities::{prelude::*, user_roles, users};

fn user_from_rows(model: users::Model, roles: Vec<user_roles::Model>) -> User {
    User {
        id: UserId::new(model.id),
        username: model.username,
        password_hash: model.password_hash,
        roles: roles.into_iter().map(|r| Role::new(r.role)).collect(),
        created_at: model.created_at,
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a user and its roles atomically.
    ///
    /// A duplicate username surfaces as the store's unique-constraint error;
    /// nothing is pre-checked here.
    pub async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[Role],
        created_at: DateTime<Utc>,
    ) -> Result<User> {
        let txn = self.conn.begin().await?;

        let user = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .with_context(|| format!("Failed to insert user '{username}'"))?;

        let role_models: Vec<user_roles::ActiveModel> = roles
            .iter()
            .map(|role| user_roles::ActiveModel {
                user_id: Set(user.id),
                role: Set(role.name().to_string()),
                ..Default::default()
            })
            .collect();

        if !role_models.is_empty() {
            UserRoles::insert_many(role_models)
                .exec(&txn)
                .await
                .context("Failed to insert user roles")?;
        }

        txn.commit().await?;

        Ok(User {
            id: UserId::new(user.id),
            username: user.username,
            password_hash: user.password_hash,
            roles: roles.to_vec(),
            created_at: user.created_at,
        })
    }

    /// Exact, case-sensitive lookup.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        self.with_roles(user).await
    }

    pub async fn exists_by_username(&self, username: &str) -> Result<bool> {
        let count = Users::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.conn)
            .await
            .context("Failed to count users by username")?;

        Ok(count > 0)
    }

    /// Returns the number of removed users; roles go with them via the
    /// `user_roles` cascade.
    pub async fn delete_by_username(&self, username: &str) -> Result<u64> {
        let result = Users::delete_many()
            .filter(users::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to delete user '{username}'"))?;

        Ok(result.rows_affected)
    }

    async fn with_roles(&self, user: Option<users::Model>) -> Result<Option<User>> {
        let Some(user) = user else {
            return Ok(None);
        };

        let roles = user
            .find_related(UserRoles)
            .order_by_asc(user_roles::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load user roles")?;

        Ok(Some(user_from_rows(user, roles)))
    }
}
