//! Admin access-key check
//!
//! The key arrives base64-encoded and is compared in plain text against the
//! configured passkey. This gates the admin view; it is not a credential
//! scheme and offers no confidentiality.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use crate::Result;

/// Marker returned to the client when the key matches
pub const ADMIN_MARKER: &str = "gi";

/// Decode `encoded` and compare it byte-for-byte with `secret`.
///
/// A mismatch is `Ok(false)`; only malformed base64 is an error.
pub fn check_access_key(encoded: &str, secret: &str) -> Result<bool> {
    let decoded = STANDARD.decode(encoded)?;
    tracing::debug!(decoded = %String::from_utf8_lossy(&decoded), "Decoded access key");
    Ok(decoded == secret.as_bytes())
}

/// Body of the access-key response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessResponse {
    pub user: Option<&'static str>,
}

impl AccessResponse {
    pub fn from_match(matched: bool) -> Self {
        Self {
            user: matched.then_some(ADMIN_MARKER),
        }
    }
}
