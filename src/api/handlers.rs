//! API handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::{self, AccessResponse};
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::appointments::{self, AppointmentSelection, AppointmentSummary};
use crate::users::{self, CreateUserRequest};
use crate::{patients, Error};

/// Liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "medrelay is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    pub timestamp: String,
}

/// Fetch a user account by id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    users::fetch_user(state.backend.as_ref(), &user_id)
        .await
        .map(Json)
        .map_err(|e| state.fail("get_user", e))
}

/// Fetch the patient document belonging to a user
pub async fn get_patient_record(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    patients::fetch_patient_by_user(state.backend.as_ref(), &user_id)
        .await
        .map(Json)
        .map_err(|e| state.fail("get_patient_record", e))
}

/// Create a patient document
pub async fn register_patient(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = payload?;

    let patient = patients::create_patient(state.backend.as_ref(), body)
        .await
        .map_err(|e| state.fail("register_patient", e))?;

    Ok((StatusCode::CREATED, Json(patient)))
}

/// Create a user, or return the existing one for the same email
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    const ROUTE: &str = "create_user";
    let Json(request) = payload?;

    let new_user = request.validate().map_err(|e| state.fail(ROUTE, e))?;

    match users::create_user(state.backend.as_ref(), &new_user).await {
        Ok(outcome) => Ok(Json(outcome.into_json())),
        Err(Error::Conflict(message)) => {
            tracing::warn!(route = ROUTE, email = %new_user.email, %message, "User conflict");
            Err(ApiError::new(StatusCode::CONFLICT, "User already exists")
                .with_field("email", message))
        }
        Err(Error::InvalidRequest(message)) => {
            tracing::warn!(route = ROUTE, email = %new_user.email, %message, "User rejected");
            let field = users::rejected_field(&message).to_string();
            Err(ApiError::bad_request("Invalid user details").with_field(&field, message))
        }
        Err(err) => Err(state.fail(ROUTE, err)),
    }
}

/// Compare a base64 access key against the admin passkey
pub async fn check_access_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<AccessResponse>, ApiError> {
    let matched = access::check_access_key(&key, &state.admin_passkey)
        .map_err(|e| state.fail("check_access_key", e))?;

    Ok(Json(AccessResponse::from_match(matched)))
}

#[derive(Debug, Deserialize)]
pub struct AdminParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Appointment counts by status, optionally for one user
pub async fn admin_summary(
    State(state): State<AppState>,
    Query(params): Query<AdminParams>,
) -> Result<Json<AppointmentSummary>, ApiError> {
    let selection = AppointmentSelection::for_user(params.user_id);

    let documents = appointments::list_appointments(state.backend.as_ref(), &selection)
        .await
        .map_err(|e| state.fail("admin_summary", e))?;

    let summary = appointments::summarize(documents);
    tracing::debug!(
        user_id = ?selection.user_id,
        total = summary.total_count,
        "Summarised appointments"
    );

    Ok(Json(summary))
}

/// JSON 404 for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
