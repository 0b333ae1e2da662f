use std::sync::Arc;

use axum::{body::Body, http::Request};
use tower_http::trace::{DefaultOnResponse, HttpMakeClassifier, MakeSpan, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{Level, Span};

use crate::context;

/// Builds the per-request span. `user_id` starts empty and is filled in by
/// `require_auth` once the caller is known.
#[derive(Clone)]
pub struct RequestSpan {
    service: Arc<str>,
}

impl RequestSpan {
    pub fn new(service: &str) -> Self {
        Self {
            service: Arc::from(service),
        }
    }
}

impl MakeSpan<Body> for RequestSpan {
    fn make_span(&mut self, req: &Request<Body>) -> Span {
        tracing::info_span!(
            "request",
            service = %self.service,
            request_id = %context::request_id(req.headers()),
            method = %req.method(),
            path = %req.uri().path(),
            user_id = tracing::field::Empty,
        )
    }
}

/// HTTP trace layer logging one line per request with its status and latency.
pub fn layer(service: &str) -> TraceLayer<HttpMakeClassifier, RequestSpan> {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan::new(service))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}
