//! `SeaORM` implementation of the `CredentialStore` trait.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::domain::{
    Role, User, ValidationError, invariants,
    validation::{validate_password, validate_username},
};
use crate::services::credential_service::{CredentialError, CredentialStore};
use crate::services::password;

pub struct SeaOrmCredentialStore {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmCredentialStore {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    async fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let password = password.to_string();
        let security = self.security.clone();

        tokio::task::spawn_blocking(move || password::hash_password(&password, &security))
            .await
            .map_err(|e| CredentialError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(|e| CredentialError::Internal(format!("{e:#}")))
    }
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn register(
        &self,
        username: &str,
        password: &str,
        roles: &[Role],
    ) -> Result<User, CredentialError> {
        validate_username(username)?;
        validate_password(password)?;
        if roles.is_empty() {
            return Err(ValidationError::new("roles", "At least one role is required").into());
        }
        if roles.iter().any(|role| role.name().trim().is_empty()) {
            return Err(ValidationError::new("roles", "Role names cannot be blank").into());
        }

        let password_hash = self.hash(password).await?;

        // No pre-check: the unique index decides, so two racing registrations
        // cannot both succeed.
        let user = match self
            .store
            .insert_user(username, &password_hash, roles, Utc::now())
            .await
        {
            Ok(user) => user,
            Err(source) => {
                let error = format!("{source:#}");
                warn!(username = %username, error = %error, "Registration rejected by store");
                metrics::counter!("auth_registrations_total", "outcome" => "conflict").increment(1);
                return Err(CredentialError::RegistrationConflict {
                    username: username.to_string(),
                    source,
                });
            }
        };

        invariants::check_user(&user)?;

        metrics::counter!("auth_registrations_total", "outcome" => "created").increment(1);
        info!(username = %user.username, user_id = %user.id, "Registered user");

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<User, CredentialError> {
        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| CredentialError::UserNotFound(username.to_string()))?;

        invariants::check_user(&user)?;
        Ok(user)
    }

    async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, CredentialError> {
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
            .await
            .map_err(|e| CredentialError::Internal(format!("Verification task failed: {e}")))?
            .map_err(|e| CredentialError::Internal(format!("{e:#}")))
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User, CredentialError> {
        let user = match self.find_by_username(username).await {
            Ok(user) => user,
            Err(CredentialError::UserNotFound(_)) => {
                metrics::counter!("auth_logins_total", "outcome" => "rejected").increment(1);
                return Err(CredentialError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !self.verify(password, &user.password_hash).await? {
            metrics::counter!("auth_logins_total", "outcome" => "rejected").increment(1);
            return Err(CredentialError::InvalidCredentials);
        }

        metrics::counter!("auth_logins_total", "outcome" => "accepted").increment(1);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn credentials() -> SeaOrmCredentialStore {
        let path = std::env::temp_dir().join(format!(
            "vitrine-credentials-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = Store::new(&format!("sqlite:{}", path.display()))
            .await
            .expect("failed to open store");

        SeaOrmCredentialStore::new(
            store,
            SecurityConfig {
                argon2_memory_cost_kib: 1024,
                argon2_time_cost: 1,
                argon2_parallelism: 1,
            },
        )
    }

    #[tokio::test]
    async fn register_stores_a_hash_not_the_password() {
        let creds = credentials().await;

        let user = creds
            .register("alice", "s3cret-pass", &[Role::standard()])
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "s3cret-pass");
        assert_eq!(user.authorities(), vec!["ROLE_USER".to_string()]);

        let loaded = creds.find_by_username("alice").await.unwrap();
        assert_eq!(loaded.id, user.id);
        assert!(creds.verify("s3cret-pass", &loaded.password_hash).await.unwrap());
        assert!(!creds.verify("other-pass", &loaded.password_hash).await.unwrap());
    }

    #[tokio::test]
    async fn short_or_blank_passwords_are_rejected() {
        let creds = credentials().await;

        for password in ["short", "        ", ""] {
            let err = creds
                .register("bob", password, &[Role::standard()])
                .await
                .unwrap_err();
            assert!(matches!(err, CredentialError::Validation(_)), "{password:?}");
        }

        assert!(matches!(
            creds.find_by_username("bob").await,
            Err(CredentialError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_username_and_roles_are_rejected() {
        let creds = credentials().await;

        assert!(matches!(
            creds.register("", "long-enough", &[Role::standard()]).await,
            Err(CredentialError::Validation(_))
        ));
        assert!(matches!(
            creds.register("carol", "long-enough", &[]).await,
            Err(CredentialError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn blank_role_names_are_rejected() {
        let creds = credentials().await;

        for name in ["", "   "] {
            let err = creds
                .register("zed", "password123", &[Role::standard(), Role::new(name)])
                .await
                .unwrap_err();
            match err {
                CredentialError::Validation(e) => assert_eq!(e.field, "roles"),
                other => panic!("expected validation error, got {other:?}"),
            }
        }

        assert!(matches!(
            creds.find_by_username("zed").await,
            Err(CredentialError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let creds = credentials().await;

        creds
            .register("dave", "first-password", &[Role::standard()])
            .await
            .unwrap();
        let err = creds
            .register("dave", "second-password", &[Role::standard()])
            .await
            .unwrap_err();

        match err {
            CredentialError::RegistrationConflict { username, .. } => assert_eq!(username, "dave"),
            other => panic!("expected conflict, got {other:?}"),
        }

        // The original account is untouched.
        let user = creds
            .authenticate("dave", "first-password")
            .await
            .unwrap();
        assert_eq!(user.username, "dave");
    }

    #[tokio::test]
    async fn concurrent_registrations_admit_exactly_one() {
        let creds = Arc::new(credentials().await);

        let a = {
            let creds = Arc::clone(&creds);
            tokio::spawn(async move {
                creds
                    .register("erin", "password-one", &[Role::standard()])
                    .await
            })
        };
        let b = {
            let creds = Arc::clone(&creds);
            tokio::spawn(async move {
                creds
                    .register("erin", "password-two", &[Role::standard()])
                    .await
            })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let created = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(CredentialError::RegistrationConflict { .. })))
            .count();

        assert_eq!(created, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn authenticate_does_not_reveal_which_part_was_wrong() {
        let creds = credentials().await;
        creds
            .register("frank", "right-password", &[Role::standard()])
            .await
            .unwrap();

        assert!(matches!(
            creds.authenticate("frank", "wrong-password").await,
            Err(CredentialError::InvalidCredentials)
        ));
        assert!(matches!(
            creds.authenticate("nobody", "right-password").await,
            Err(CredentialError::InvalidCredentials)
        ));
        assert!(matches!(
            creds.authenticate("Frank", "right-password").await,
            Err(CredentialError::InvalidCredentials)
        ));
    }
}
