//! Request extractors that reject with an [`AppError`] envelope instead of
//! axum's plain-text rejections.

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::errors::AppError;
use crate::field::query::from_query_str;

/// JSON body. A body over the size limit becomes a 413; any other decode
/// failure becomes `Invalid JSON request body.`
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    AppError::BodyTooLarge
                } else {
                    AppError::InvalidJson(rejection.body_text())
                }
            })?;
        Ok(Self(value))
    }
}

/// URL query decoded with explicit-null support (`?due_date=null`).
pub struct QueryFilter<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryFilter<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        from_query_str(query)
            .map(Self)
            .map_err(|e| AppError::InvalidQuery(e.key.into_iter().collect()))
    }
}

/// A `:id` path segment that must be a UUID.
pub struct ResourceId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Undecodable segments (e.g. invalid UTF-8) are reported with the raw text.
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                let segment = parts.uri.path().rsplit('/').next().unwrap_or_default();
                AppError::InvalidId(segment.to_string())
            })?;
        Uuid::parse_str(&raw)
            .map(Self)
            .map_err(|_| AppError::InvalidId(raw))
    }
}
