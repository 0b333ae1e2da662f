use std::sync::Arc;

use axum::extract::State;

use crate::api::extract::JsonBody;
use crate::api::response::ApiResponse;
use crate::context::RequestScope;
use crate::errors::AppError;
use crate::models::user::{Credentials, Identity, TokenPair};
use crate::AppState;

/// `POST /login`: exchange email and password for an access/refresh token
/// pair. Unknown email and wrong password produce the same response.
pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<ApiResponse<TokenPair>, AppError> {
    let user = state.db.find_user_by_email(&credentials.email).await?;
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let matched = state
        .passwords
        .verify(credentials.password, stored_hash)
        .await?;

    let user = match user {
        Some(user) if matched => user,
        _ => return Err(AppError::BadCredentials),
    };

    let token = state.tokens.issue(user.id, state.config.access_token_ttl)?;
    let refresh_token = state.tokens.issue(user.id, state.config.refresh_token_ttl)?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::ok(TokenPair {
        token,
        refresh_token,
    }))
}

/// `POST /register`: create an account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<ApiResponse<()>, AppError> {
    credentials.validate_registration()?;

    let hash = state.passwords.hash(credentials.password).await?;
    state.db.create_user(&credentials.email, &hash).await?;

    Ok(ApiResponse::empty())
}

/// `GET /verify-auth`: who the bearer token belongs to.
pub async fn whoami(
    State(state): State<Arc<AppState>>,
    scope: RequestScope,
) -> Result<ApiResponse<Identity>, AppError> {
    let user = state.db.get_user(scope.user_id()).await?;
    Ok(ApiResponse::ok(Identity::from(user)))
}
