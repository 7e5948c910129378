//! Authenticated session
//!
//! The session is injected into the checkout sequencer; business logic
//! reads the bearer token only through [`AuthSession::current_token`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use thiserror::Error;
use validator::Validate;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("AuthToken(**redacted**)") }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool { self.role.as_deref() == Some("admin") }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub token: AuthToken,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Default)]
pub struct AuthSession {
    current: RwLock<Option<Session>>,
}

impl AuthSession {
    pub fn new() -> Self { Self::default() }

    pub fn with_session(session: Session) -> Self {
        Self { current: RwLock::new(Some(session)) }
    }

    pub fn sign_in(&self, session: Session) {
        tracing::info!(user_id = %session.user.id, "signed in");
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(session);
    }

    pub fn sign_out(&self) {
        if let Some(session) = self.current.write().unwrap_or_else(|e| e.into_inner()).take() {
            tracing::info!(user_id = %session.user.id, "signed out");
        }
    }

    pub fn current_token(&self) -> Option<AuthToken> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).as_ref().map(|s| s.token.clone())
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).as_ref().map(|s| s.user.clone())
    }

    pub fn is_admin(&self) -> bool { self.current_user().is_some_and(|u| u.is_admin()) }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Rejected(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to parse response: {0}")]
    Decode(String),
}
