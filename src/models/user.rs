use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::validation::{is_email, FieldErrors, MSG_BLANK, MSG_EMAIL};
use crate::errors::AppError;

pub const PASSWORD_MIN_LEN: usize = 8;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /login` and `POST /register`.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn validate_registration(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        errors
            .check("email", !self.email.trim().is_empty(), MSG_BLANK)
            .check("email", is_email(&self.email), MSG_EMAIL)
            .check("password", !self.password.is_empty(), MSG_BLANK)
            .check(
                "password",
                self.password.chars().count() >= PASSWORD_MIN_LEN,
                format!("The length must be no less than {}.", PASSWORD_MIN_LEN),
            );
        errors.finish()
    }
}

/// Returned by a successful login.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// Public view of the authenticated user.
#[derive(Debug, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}
