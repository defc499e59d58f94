//! medrelay - an HTTP gateway in front of a hosted backend-as-a-service
//!
//! Exposes a handful of JSON endpoints for a patient-facing frontend:
//! - User lookup and email-idempotent user creation (identity store)
//! - Patient registration and lookup (document store)
//! - Appointment listing with per-status counts
//! - A base64 access-key check for the admin view

pub mod access;
pub mod api;
pub mod appointments;
pub mod backend;
pub mod config;
pub mod error;
pub mod patients;
pub mod users;

pub use error::{Error, Result};
