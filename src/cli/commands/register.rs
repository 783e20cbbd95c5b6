//! Register user command handler

use crate::config::Config;
use crate::db::Store;
use crate::domain::Role;
use crate::services::{CredentialError, CredentialStore, SeaOrmCredentialStore};

pub async fn cmd_register_user(
    config: &Config,
    username: &str,
    password: &str,
    roles: &[String],
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let credentials = SeaOrmCredentialStore::new(store, config.security.clone());

    let roles: Vec<Role> = if roles.is_empty() {
        vec![Role::standard()]
    } else {
        roles.iter().map(|r| Role::new(r.trim().to_uppercase())).collect()
    };

    match credentials.register(username, password, &roles).await {
        Ok(user) => {
            println!("✓ Registered '{}' (ID: {})", user.username, user.id);
            println!("  Authorities: {}", user.authorities().join(", "));
            Ok(())
        }
        Err(CredentialError::RegistrationConflict { username, source }) => {
            println!("✗ Could not register '{username}': {source:#}");
            Err(anyhow::anyhow!("Registration failed"))
        }
        Err(e) => Err(e.into()),
    }
}
