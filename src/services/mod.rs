pub mod catalog_service;
pub use catalog_service::{CatalogError, CatalogService};

pub mod catalog_service_impl;
pub use catalog_service_impl::SeaOrmCatalogService;

pub mod credential_service;
pub use credential_service::{CredentialError, CredentialStore};

pub mod credential_service_impl;
pub use credential_service_impl::SeaOrmCredentialStore;

pub mod password;
