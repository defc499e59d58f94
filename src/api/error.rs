//! Mapping from crate errors to HTTP responses

use std::any::Any;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

use crate::Error;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error response: `{"message", "error"?, "fields"?}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
    pub fields: Map<String, Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
            fields: Map::new(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_field(mut self, field: &str, message: impl Into<String>) -> Self {
        self.fields
            .insert(field.to_string(), Value::String(message.into()));
        self
    }

    /// Translate a crate error.
    ///
    /// Only local input validation is reported as a client error. Every
    /// other fault, including a not-found or rejection from the hosted
    /// backend, becomes a generic 500 whose detail is attached only when
    /// `expose` is set.
    pub fn from_error(err: &Error, expose: bool) -> Self {
        if let Error::Validation(fields) = err {
            let mut api_err = Self::bad_request("Invalid request");
            for (field, message) in fields.iter() {
                api_err = api_err.with_field(field, message);
            }
            return api_err;
        }

        if expose {
            Self::internal().with_detail(err.to_string())
        } else {
            Self::internal()
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(self.message));
        if let Some(detail) = self.detail {
            body.insert("error".to_string(), Value::String(detail));
        }
        if !self.fields.is_empty() {
            body.insert("fields".to_string(), Value::Object(self.fields));
        }
        (self.status, Json(Value::Object(body))).into_response()
    }
}

/// Response for a panic caught inside a handler
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::internal().into_response()
}
