use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::db::Store;
use crate::policy::AccessPolicy;
use crate::services::{
    CatalogService, CredentialStore, SeaOrmCatalogService, SeaOrmCredentialStore,
};

pub mod auth;
mod error;
mod images;
mod observability;
mod products;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,

    pub credentials: Arc<dyn CredentialStore>,

    pub catalog: Arc<dyn CatalogService>,

    pub policy: AccessPolicy,

    pub config: Config,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

pub fn create_app_state(
    store: Store,
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let credentials = Arc::new(SeaOrmCredentialStore::new(
        store.clone(),
        config.security.clone(),
    ));
    let catalog = Arc::new(SeaOrmCatalogService::new(store.clone()));

    Arc::new(AppState {
        store,
        credentials,
        catalog,
        policy: AccessPolicy::default(),
        config,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    Ok(create_app_state(store, config, prometheus_handle))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such page".to_string())
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name(server.session_cookie_name.clone())
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )));

    let body_limit = DefaultBodyLimit::max(server.max_upload_bytes);

    // Every route, the fallback included, sits behind the access policy.
    // CSRF tokens are deliberately not issued or checked.
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route("/me", get(auth::me))
        .route("/", get(products::list_products))
        .route("/product/create", post(products::create_product))
        .route("/product/{id}", get(products::get_product))
        .route("/product/edit/{id}", get(products::edit_product))
        .route("/product/update/{id}", post(products::update_product))
        .route("/product/delete/{id}", post(products::delete_product))
        .route("/images/{id}", get(images::get_image))
        .route("/metrics", get(observability::get_metrics))
        .route("/health", get(system::health))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(session_layer)
        .layer(body_limit)
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .with_state(state)
}
