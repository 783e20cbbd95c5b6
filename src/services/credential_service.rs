//! Domain service for account registration and credential checks.

use thiserror::Error;

use crate::domain::{ConsistencyViolation, Role, User, ValidationError};

/// Errors specific to credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User '{0}' not found")]
    UserNotFound(String),

    /// The store refused the new account, most often because the username is
    /// taken. The store error is kept as the source.
    #[error("Failed to register user '{username}'")]
    RegistrationConflict {
        username: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Consistency(#[from] ConsistencyViolation),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CredentialError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CredentialError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// Domain service trait for credentials.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Hashes the password and persists a new user.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Validation`] for an empty username, a blank or
    ///   short password, or an empty role list
    /// - [`CredentialError::RegistrationConflict`] if the store rejects the write
    async fn register(
        &self,
        username: &str,
        password: &str,
        roles: &[Role],
    ) -> Result<User, CredentialError>;

    /// Exact, case-sensitive lookup.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::UserNotFound`] if no such user exists.
    async fn find_by_username(&self, username: &str) -> Result<User, CredentialError>;

    /// One-way comparison of a plaintext password with a stored hash.
    async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, CredentialError>;

    /// Looks the user up and verifies the password.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidCredentials`] for an unknown user or a
    /// wrong password, without saying which.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, CredentialError>;
}
