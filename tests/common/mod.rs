//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tower::ServiceExt;
use uuid::Uuid;

use todolist::config::{Config, DatabaseConfig};
use todolist::store::PgStore;
use todolist::AppState;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

pub fn test_config() -> Config {
    Config {
        service_name: "todolist-test".into(),
        api_host: "127.0.0.1".into(),
        api_port: 0,
        database: DatabaseConfig {
            host: "localhost".into(),
            port: 5432,
            user: "todolist".into(),
            password: "todolist".into(),
            name: "todolist".into(),
            ssl_mode: "disable".into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(5),
        },
        jwt_secret: SECRET.into(),
        access_token_ttl: chrono::Duration::minutes(5),
        refresh_token_ttl: chrono::Duration::hours(72),
        bcrypt_cost: 4,
        request_timeout: Duration::from_secs(10),
        cors_allowed_origins: vec!["http://localhost:5173".into()],
    }
}

/// State over a pool that never connects. Good for every request that is
/// answered before reaching the database.
pub fn offline_state() -> Arc<AppState> {
    offline_state_with(test_config())
}

pub fn offline_state_with(config: Config) -> Arc<AppState> {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy_with(PgConnectOptions::new().host("127.0.0.1").port(1));
    let db = PgStore::new(pool, Duration::from_secs(1));
    Arc::new(AppState::new(config, db).unwrap())
}

/// A migrated store on DATABASE_URL, or `None` when it is unset so
/// database tests are skipped rather than failed.
pub async fn database() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    let store = PgStore::new(pool, Duration::from_secs(5));
    store.migrate().await.expect("apply migrations");
    Some(store)
}

pub async fn database_state() -> Option<Arc<AppState>> {
    let db = database().await?;
    Some(Arc::new(AppState::new(test_config(), db).unwrap()))
}

pub fn unique_email() -> String {
    format!("user-{}@example.com", Uuid::new_v4().simple())
}

pub fn bearer(state: &AppState, user: Uuid) -> String {
    let token = state
        .tokens
        .issue(user, chrono::Duration::minutes(5))
        .unwrap();
    format!("Bearer {}", token)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "response is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
