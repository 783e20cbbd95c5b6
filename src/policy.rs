//! Access policy: which requests need a signed-in user, and how the session
//! moves between anonymous and authenticated.
//!
//! Nothing here touches HTTP types; the middleware in [`crate::api::auth`]
//! feeds paths and session contents in and acts on the decisions.

use serde::{Deserialize, Serialize};

use crate::domain::{Role, User, UserId};

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const LANDING_PATH: &str = "/";

pub const LOGIN_ERROR_REDIRECT: &str = "/login?error=true";
pub const LOGOUT_REDIRECT: &str = "/login?logout=true";

/// Session key the signed-in user is stored under.
pub const SESSION_USER_KEY: &str = "user";

/// Anything that can stand as the authenticated party of a request.
pub trait Principal {
    fn username(&self) -> &str;

    fn roles(&self) -> &[Role];

    /// Roles in `ROLE_<name>` form.
    fn authorities(&self) -> Vec<String> {
        self.roles().iter().map(Role::authority).collect()
    }
}

impl Principal for User {
    fn username(&self) -> &str {
        &self.username
    }

    fn roles(&self) -> &[Role] {
        &self.roles
    }
}

/// What a session remembers about its user. Never holds the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
        }
    }
}

impl Principal for SessionUser {
    fn username(&self) -> &str {
        &self.username
    }

    fn roles(&self) -> &[Role] {
        &self.roles
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(SessionUser),
}

impl SessionState {
    #[must_use]
    pub fn from_session(user: Option<SessionUser>) -> Self {
        user.map_or(Self::Anonymous, Self::Authenticated)
    }

    #[must_use]
    pub const fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Applies a lifecycle event, returning the next state and where the
    /// client should be sent.
    #[must_use]
    pub fn apply(self, event: SessionEvent) -> Transition {
        match event {
            SessionEvent::CredentialsAccepted(user) => Transition {
                state: Self::Authenticated(user),
                redirect: LANDING_PATH,
            },
            SessionEvent::CredentialsRejected => Transition {
                state: self,
                redirect: LOGIN_ERROR_REDIRECT,
            },
            SessionEvent::Logout => Transition {
                state: Self::Anonymous,
                redirect: LOGOUT_REDIRECT,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CredentialsAccepted(SessionUser),
    CredentialsRejected,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub redirect: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Permit,
    RedirectToLogin,
}

/// Binary gate: the login and registration surfaces are open, everything
/// else needs an authenticated session. Roles are carried but not checked.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    public_paths: Vec<&'static str>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            public_paths: vec![LOGIN_PATH, REGISTER_PATH],
        }
    }
}

impl AccessPolicy {
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(&path)
    }

    #[must_use]
    pub fn evaluate(&self, path: &str, state: &SessionState) -> Access {
        if self.is_public(path) || state.is_authenticated() {
            Access::Permit
        } else {
            Access::RedirectToLogin
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SessionUser {
        SessionUser {
            user_id: UserId::new(1),
            username: "alice".to_string(),
            roles: vec![Role::standard()],
        }
    }

    #[test]
    fn anonymous_requests_only_reach_public_surfaces() {
        let policy = AccessPolicy::default();
        let anon = SessionState::Anonymous;

        assert_eq!(policy.evaluate("/login", &anon), Access::Permit);
        assert_eq!(policy.evaluate("/register", &anon), Access::Permit);

        for path in ["/", "/product/1", "/images/3", "/logout", "/metrics", "/login/x"] {
            assert_eq!(policy.evaluate(path, &anon), Access::RedirectToLogin, "{path}");
        }
    }

    #[test]
    fn authenticated_requests_reach_everything() {
        let policy = AccessPolicy::default();
        let state = SessionState::Authenticated(alice());

        for path in ["/", "/product/edit/2", "/login", "/register", "/me"] {
            assert_eq!(policy.evaluate(path, &state), Access::Permit, "{path}");
        }
    }

    #[test]
    fn accepted_credentials_authenticate_and_land() {
        let t = SessionState::Anonymous.apply(SessionEvent::CredentialsAccepted(alice()));

        assert_eq!(t.state, SessionState::Authenticated(alice()));
        assert_eq!(t.redirect, "/");
    }

    #[test]
    fn rejected_credentials_keep_the_prior_state() {
        let t = SessionState::Anonymous.apply(SessionEvent::CredentialsRejected);
        assert_eq!(t.state, SessionState::Anonymous);
        assert_eq!(t.redirect, "/login?error=true");

        let signed_in = SessionState::Authenticated(alice());
        let t = signed_in.clone().apply(SessionEvent::CredentialsRejected);
        assert_eq!(t.state, signed_in);
    }

    #[test]
    fn logout_always_ends_anonymous() {
        for state in [SessionState::Anonymous, SessionState::Authenticated(alice())] {
            let t = state.apply(SessionEvent::Logout);
            assert_eq!(t.state, SessionState::Anonymous);
            assert_eq!(t.redirect, "/login?logout=true");
        }
    }

    #[test]
    fn principal_authorities_are_prefixed() {
        let user = SessionUser {
            roles: vec![Role::standard(), Role::new("ADMIN")],
            ..alice()
        };

        assert_eq!(user.authorities(), vec!["ROLE_USER", "ROLE_ADMIN"]);
        assert_eq!(Principal::username(&user), "alice");
    }
}
