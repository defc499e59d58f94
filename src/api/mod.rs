//! HTTP API server

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{Error, Result};

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

/// Build the API router using the provided application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/patient/register", post(handlers::register_patient))
        .route("/patient/:user_id", get(handlers::get_user))
        .route("/patient/:user_id/record", get(handlers::get_patient_record))
        .route("/create-user", post(handlers::create_user))
        .route("/api/:key", get(handlers::check_access_key))
        .route("/admin", get(handlers::admin_summary))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Allow the configured frontend origin, or any origin when none is set
pub fn with_cors(router: Router, frontend_origin: Option<&str>) -> Result<Router> {
    let cors = match frontend_origin {
        Some(origin) => {
            let origin = origin.trim().trim_end_matches('/');
            let value = HeaderValue::from_str(origin).map_err(|e| {
                Error::Config(format!("invalid frontend origin '{}': {}", origin, e))
            })?;
            CorsLayer::new()
                .allow_origin(value)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE])
        }
        None => CorsLayer::permissive(),
    };

    Ok(router.layer(cors))
}
