use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::api::response::{internal_error_response, Envelope};
use crate::auth::AuthError;

/// Public message for every internal failure. Internal details only go to logs.
pub const INTERNAL_MESSAGE: &str = "Unexpected error. We've noted the issue. Please try again later.";

/// The category of a failure, which fixes its HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    PayloadTooLarge,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured detail attached to a client error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorData {
    /// Per-field validation messages, keyed by field name.
    Fields(BTreeMap<String, String>),
    /// Query keys that failed to decode.
    Keys(Vec<String>),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid id '{0}'")]
    InvalidId(String),

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("request body exceeds the size limit")]
    BodyTooLarge,

    #[error("invalid URL query (keys: {0:?})")]
    InvalidQuery(Vec<String>),

    #[error("validation failed: {0:?}")]
    Validation(BTreeMap<String, String>),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("incorrect email or password")]
    BadCredentials,

    #[error("permission denied")]
    PermissionDenied,

    #[error("id '{0}' not found")]
    NotFound(Uuid),

    #[error("{field} '{value}' already exists")]
    Conflict { field: &'static str, value: String },

    #[error("no route matches the request")]
    RouteNotFound,

    #[error("method not allowed for this route")]
    MethodNotAllowed,

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Database failures that reach this point are unexpected: store methods
/// translate the expected ones (unique violations, missing rows) themselves.
/// Going through `anyhow` captures a backtrace at the conversion site when
/// library backtraces are enabled (see [`enable_backtraces`]).
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err).context("database error"))
    }
}

/// Turn on backtrace capture for `anyhow` errors unless the operator already
/// chose a setting. Panics keep their own forced capture in the panic hook.
///
/// Call before the async runtime starts.
pub fn enable_backtraces() {
    if std::env::var_os("RUST_BACKTRACE").is_none() && std::env::var_os("RUST_LIB_BACKTRACE").is_none() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidId(_)
            | AppError::InvalidJson(_)
            | AppError::InvalidQuery(_)
            | AppError::Validation(_) => ErrorKind::BadRequest,
            AppError::Auth(_) | AppError::BadCredentials => ErrorKind::Unauthorized,
            AppError::PermissionDenied => ErrorKind::Forbidden,
            AppError::NotFound(_) | AppError::RouteNotFound => ErrorKind::NotFound,
            AppError::MethodNotAllowed => ErrorKind::MethodNotAllowed,
            AppError::Conflict { .. } => ErrorKind::Conflict,
            AppError::BodyTooLarge => ErrorKind::PayloadTooLarge,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message written into the response envelope.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidId(id) => format!("Invalid ID '{}'.", id),
            AppError::InvalidJson(_) => "Invalid JSON request body.".to_string(),
            AppError::BodyTooLarge => "Request body is too large.".to_string(),
            AppError::InvalidQuery(keys) if keys.is_empty() => "Invalid URL query.".to_string(),
            AppError::InvalidQuery(keys) => format!("Invalid URL query: {}.", keys.join(", ")),
            AppError::Validation(_) => "Invalid input value.".to_string(),
            AppError::Auth(err) => err.to_string(),
            AppError::BadCredentials => "Incorrect email or password.".to_string(),
            AppError::PermissionDenied => "Permission denied.".to_string(),
            AppError::NotFound(id) => format!("ID '{}' not found.", id),
            AppError::Conflict { field, value } => format!("{} '{}' already exists.", field, value),
            AppError::RouteNotFound => "Resource not found.".to_string(),
            AppError::MethodNotAllowed => "Method not allowed.".to_string(),
            AppError::Internal(_) => INTERNAL_MESSAGE.to_string(),
        }
    }

    pub fn data(&self) -> Option<ErrorData> {
        match self {
            AppError::Validation(fields) => Some(ErrorData::Fields(fields.clone())),
            AppError::InvalidQuery(keys) if !keys.is_empty() => Some(ErrorData::Keys(keys.clone())),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        if kind == ErrorKind::Internal {
            // `{:?}` on an anyhow error prints the cause chain and the
            // captured backtrace, if any.
            tracing::error!(category = "internal_error", "{}: {:?}", self, self);
            return internal_error_response();
        }

        let status = kind.status();
        tracing::info!(
            category = "client_error",
            status = status.as_u16(),
            detail = %self,
            "{}",
            self.public_message()
        );

        let body = Envelope::fail(self.public_message(), self.data());
        (status, body).into_response()
    }
}
