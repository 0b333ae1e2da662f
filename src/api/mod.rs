use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::middleware::auth::{require_auth, verify_auth};
use crate::AppState;

pub mod auth;
pub mod extract;
pub mod response;
pub mod tasks;
pub mod validation;

/// Build the `/api/v1` router.
/// All routes are relative; the caller mounts this under `/api/v1`.
///
/// Every route passes `verify_auth`. Only the private group also passes
/// `require_auth`, so `/login` and `/register` work without a token.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let private = Router::new()
        .route("/verify-auth", get(auth::whoami))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .merge(private)
        .layer(middleware::from_fn_with_state(state, verify_auth))
        .fallback(fallback_404)
}

pub async fn fallback_404() -> AppError {
    AppError::RouteNotFound
}

/// Middleware: axum answers a known path with an unsupported method with a
/// bare 405. Rewrite it into the error envelope, keeping the `Allow` header.
pub async fn method_not_allowed(req: Request, next: Next) -> Response {
    let resp = next.run(req).await;
    if resp.status() != StatusCode::METHOD_NOT_ALLOWED {
        return resp;
    }

    let allow = resp.headers().get(header::ALLOW).cloned();
    let mut enveloped = AppError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(header::ALLOW, allow);
    }
    enveloped
}
