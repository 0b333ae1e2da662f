//! todolist: multi-user task list API with stateless bearer-token auth.
//!
//! Library crate so integration tests in `tests/` can build the same router
//! the binary serves.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod field;
pub mod middleware;
pub mod models;
pub mod store;

use auth::{PasswordHasher, TokenCodec};
use config::Config;
use store::PgStore;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub db: PgStore,
    pub tokens: TokenCodec,
    pub passwords: PasswordHasher,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, db: PgStore) -> anyhow::Result<Self> {
        Ok(Self {
            db,
            tokens: TokenCodec::new(config.jwt_secret.as_bytes()),
            passwords: PasswordHasher::new(config.bcrypt_cost)?,
            config,
        })
    }
}

/// The full HTTP application: heartbeat, `/api/v1`, and the layers every
/// request passes through (outermost first): security headers, request id,
/// CORS, tracing, body limit, panic recovery, deadline, 405 envelope.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(heartbeat))
        .nest("/api/v1", api::api_router(state.clone()))
        .fallback(api::fallback_404)
        .with_state(state.clone())
        .layer(axum::middleware::from_fn(api::method_not_allowed))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::deadline::request_deadline,
        ))
        .layer(CatchPanicLayer::custom(middleware::panic::handle_panic))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::trace::layer(&state.config.service_name))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(axum::middleware::from_fn(middleware::headers::security_headers))
}

/// Liveness probe for load balancers; no auth, no envelope.
async fn heartbeat() -> &'static str {
    "200 OK"
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::HeaderName::from_static("x-request-id")])
}
