//! API server state

use std::sync::Arc;

use crate::api::error::ApiError;
use crate::backend::RecordBackend;
use crate::Error;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Identity and document store facade
    pub backend: Arc<dyn RecordBackend>,

    /// Secret the admin access key must decode to
    pub admin_passkey: Arc<str>,

    /// Include internal error detail in responses (development only)
    pub expose_errors: bool,
}

impl AppState {
    pub fn new(backend: Arc<dyn RecordBackend>, admin_passkey: impl Into<Arc<str>>) -> Self {
        Self {
            backend,
            admin_passkey: admin_passkey.into(),
            expose_errors: false,
        }
    }

    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.expose_errors = expose;
        self
    }

    /// Log a failed request and convert the error into a response.
    pub fn fail(&self, route: &'static str, err: Error) -> ApiError {
        let api_err = ApiError::from_error(&err, self.expose_errors);
        if api_err.status.is_server_error() {
            tracing::error!(route, error = %err, "Request failed");
        } else {
            tracing::warn!(route, error = %err, "Request rejected");
        }
        api_err
    }
}
