use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

/// Middleware: bounds the whole handler by the configured request timeout.
///
/// On expiry the handler future is dropped. Any open transaction goes with
/// it and is rolled back, so no partial write survives a timed-out request.
pub async fn request_deadline(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let limit = state.config.request_timeout;
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(resp) => resp,
        Err(_) => AppError::Internal(anyhow::anyhow!(
            "request exceeded its {}ms deadline",
            limit.as_millis()
        ))
        .into_response(),
    }
}
