//! The JSON envelope every API response is wrapped in.
//!
//! ```json
//! {"status": "SUCCESS", "data": {...}}
//! {"status": "FAIL", "message": "Invalid input value.", "data": {"subject": "Cannot be blank."}}
//! {"status": "ERROR", "message": "Unexpected error. ..."}
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::errors::{ErrorData, INTERNAL_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// The request succeeded.
    Success,
    /// The client sent something we refuse (4xx).
    Fail,
    /// The server failed (5xx).
    Error,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: Option<T>) -> Self {
        Self {
            status: Status::Success,
            message: None,
            data,
        }
    }
}

impl Envelope<ErrorData> {
    pub fn fail(message: String, data: Option<ErrorData>) -> Self {
        Self {
            status: Status::Fail,
            message: Some(message),
            data,
        }
    }

    pub fn error() -> Self {
        Self {
            status: Status::Error,
            message: Some(INTERNAL_MESSAGE.to_string()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A successful handler result: status code plus `SUCCESS` envelope.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope::success(Some(data)),
        }
    }

    /// 201 with the created resource.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Envelope::success(Some(data)),
        }
    }
}

impl ApiResponse<()> {
    /// 200 with no `data` key.
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope::success(None),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

/// The generic 500 envelope. Used by `AppError` after logging, and by the
/// panic handler where no error value exists.
pub fn internal_error_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Envelope::error()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let body = serde_json::to_value(Envelope::success(Some(json!({"id": 1})))).unwrap();
        assert_eq!(body, json!({"status": "SUCCESS", "data": {"id": 1}}));
    }

    #[test]
    fn test_empty_success_has_no_data_key() {
        let body = serde_json::to_value(Envelope::<()>::success(None)).unwrap();
        assert_eq!(body, json!({"status": "SUCCESS"}));
    }

    #[test]
    fn test_error_envelope_shape() {
        let body = serde_json::to_value(Envelope::error()).unwrap();
        assert_eq!(body, json!({"status": "ERROR", "message": INTERNAL_MESSAGE}));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiResponse::ok(1).into_response().status(), StatusCode::OK);
        assert_eq!(ApiResponse::created(1).into_response().status(), StatusCode::CREATED);
        assert_eq!(ApiResponse::empty().into_response().status(), StatusCode::OK);
    }
}
