//! Credentials: bearer-token codec and password hashing.

use thiserror::Error;

pub mod password;
pub mod token;

pub use password::PasswordHasher;
pub use token::TokenCodec;

/// Why a request could not be authenticated. The `Display` text is the
/// message clients see in the 401 envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is missing.")]
    MissingHeader,

    #[error("Authorization header is not a Bearer token.")]
    MalformedHeader,

    #[error("Token verification failed.")]
    InvalidToken,

    #[error("Token has expired.")]
    ExpiredToken,

    #[error("Token subject is not a valid UUID.")]
    InvalidSubject,
}
