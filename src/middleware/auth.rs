//! Two-stage request authentication.
//!
//! `verify_auth` runs on every `/api/v1` route and never rejects: it records
//! the outcome of checking the bearer token as an [`Authentication`]
//! extension. `require_auth` is mounted only on private routes and turns a
//! failed outcome into a 401. Public routes such as `/login` sit behind the
//! first stage only.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::AuthError;
use crate::context::{self, Principal, RequestScope};
use crate::errors::AppError;
use crate::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Outcome of the verify stage, stored in request extensions.
#[derive(Debug, Clone)]
pub struct Authentication(pub Result<Principal, AuthError>);

/// Stage one: decode the `Authorization` header, if any, and record the
/// outcome. Always forwards the request.
pub async fn verify_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let outcome = bearer_token(req.headers()).and_then(|token| state.tokens.verify(token));
    if let Err(reason) = &outcome {
        tracing::debug!(%reason, "request carries no valid credentials");
    }
    req.extensions_mut().insert(Authentication(outcome));
    next.run(req).await
}

/// Stage two: reject the request unless stage one succeeded, then expose the
/// caller to handlers as a [`RequestScope`].
pub async fn require_auth(mut req: Request, next: Next) -> Response {
    let outcome = match req.extensions().get::<Authentication>() {
        Some(Authentication(outcome)) => *outcome,
        None => {
            return AppError::Internal(anyhow::anyhow!(
                "require_auth reached without verify_auth having run"
            ))
            .into_response();
        }
    };

    let principal = match outcome {
        Ok(principal) => principal,
        Err(reason) => return AppError::Auth(reason).into_response(),
    };

    tracing::Span::current().record("user_id", tracing::field::display(principal));

    let request_id = context::request_id(req.headers());
    req.extensions_mut()
        .insert(RequestScope::new(request_id, principal));
    next.run(req).await
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::MalformedHeader)
}
