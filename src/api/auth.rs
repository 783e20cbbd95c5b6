use axum::{
    Extension, Form, Json,
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};

use super::{ApiError, ApiResponse, AppState, PrincipalDto, SurfaceDto};
use crate::domain::Role;
use crate::policy::{
    Access, LOGIN_PATH, SESSION_USER_KEY, SessionEvent, SessionState, SessionUser,
};
use crate::services::CredentialError;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginSurfaceQuery {
    pub error: Option<String>,
    pub logout: Option<String>,
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Validation(e) => Self::validation(e.to_string()),
            CredentialError::InvalidCredentials => {
                Self::Unauthorized("Invalid credentials".to_string())
            }
            CredentialError::UserNotFound(username) => Self::not_found("User", username),
            CredentialError::RegistrationConflict { username, source } => {
                let error = format!("{source:#}");
                warn!(username = %username, error = %error, "Registration conflict");
                Self::Conflict(format!(
                    "Could not register '{username}'. The username may already be taken"
                ))
            }
            CredentialError::Consistency(e) => Self::internal(e.to_string()),
            CredentialError::Database(msg) => Self::DatabaseError(msg),
            CredentialError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Applies the access policy to every request.
///
/// A signed-in user is made available to handlers as an
/// `Extension<SessionUser>`; anonymous requests to anything but the public
/// surfaces are redirected to the login page.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match session.get::<SessionUser>(SESSION_USER_KEY).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "Failed to read session, treating request as anonymous");
            None
        }
    };

    let session_state = SessionState::from_session(user);

    if let Some(user) = session_state.user() {
        tracing::Span::current().record("user_id", user.user_id.value());
        request.extensions_mut().insert(user.clone());
    }

    match state.policy.evaluate(request.uri().path(), &session_state) {
        Access::Permit => next.run(request).await,
        Access::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /login
pub async fn login_page(Query(query): Query<LoginSurfaceQuery>) -> impl IntoResponse {
    Json(ApiResponse::success(SurfaceDto {
        surface: "login",
        error: query.error.is_some(),
        logout: query.logout.is_some(),
    }))
}

/// POST /login
/// Form login. Failures go back to the login surface with an error flag.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, ApiError> {
    let current = SessionState::from_session(
        session
            .get::<SessionUser>(SESSION_USER_KEY)
            .await
            .ok()
            .flatten(),
    );

    let event = match state
        .credentials
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => SessionEvent::CredentialsAccepted(SessionUser::from(&user)),
        Err(CredentialError::InvalidCredentials) => {
            info!(username = %form.username, "Login rejected");
            SessionEvent::CredentialsRejected
        }
        Err(e) => return Err(e.into()),
    };

    let transition = current.apply(event);

    if let SessionState::Authenticated(user) = &transition.state {
        // Fresh id on privilege change.
        session
            .cycle_id()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;
        session
            .insert(SESSION_USER_KEY, user)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
        info!(username = %user.username, user_id = %user.user_id, "User logged in");
    }

    Ok(Redirect::to(transition.redirect))
}

/// GET|POST /logout
/// Drops the session record and expires its cookie.
pub async fn logout(session: Session) -> Result<Redirect, ApiError> {
    let current = SessionState::from_session(
        session
            .get::<SessionUser>(SESSION_USER_KEY)
            .await
            .ok()
            .flatten(),
    );

    if let Some(user) = current.user() {
        info!(username = %user.username, "User logged out");
    }

    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to end session: {e}")))?;

    Ok(Redirect::to(current.apply(SessionEvent::Logout).redirect))
}

/// GET /register
pub async fn register_page() -> impl IntoResponse {
    Json(ApiResponse::success(SurfaceDto {
        surface: "register",
        error: false,
        logout: false,
    }))
}

/// POST /register
/// Self-registration always grants the standard role.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, ApiError> {
    state
        .credentials
        .register(&form.username, &form.password, &[Role::standard()])
        .await?;

    Ok(Redirect::to(LOGIN_PATH))
}

/// GET /me
pub async fn me(Extension(user): Extension<SessionUser>) -> impl IntoResponse {
    Json(ApiResponse::success(PrincipalDto::from(&user)))
}
