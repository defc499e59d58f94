//! Patient registration documents

use serde_json::{Map, Value};

use crate::backend::{Collection, Query, RecordBackend};
use crate::error::FieldErrors;
use crate::{Error, Result};

/// Identification fields every new patient document starts with
const IDENTIFICATION_FIELDS: [&str; 2] = ["identificationDocumentId", "identificationDocumentUrl"];

/// Build the document stored for a registration request.
///
/// The identification fields start out null and are filled later; caller
/// fields are merged over them.
pub fn registration_document(body: Value) -> Result<Map<String, Value>> {
    let mut errors = FieldErrors::new();
    let Value::Object(fields) = body else {
        errors.add("body", "must be a JSON object");
        return Err(Error::Validation(errors));
    };

    match fields.get("userId") {
        Some(Value::String(id)) if !id.trim().is_empty() => {}
        Some(Value::String(_)) | None => errors.add("userId", "is required"),
        Some(_) => errors.add("userId", "must be a string"),
    }
    errors.into_result()?;

    let mut document: Map<String, Value> = IDENTIFICATION_FIELDS
        .iter()
        .map(|name| (name.to_string(), Value::Null))
        .collect();
    document.extend(fields);
    Ok(document)
}

pub async fn create_patient(backend: &dyn RecordBackend, body: Value) -> Result<Value> {
    let document = registration_document(body)?;
    let patient = backend.create_document(Collection::Patients, document).await?;
    tracing::info!(patient_id = ?patient.get("$id"), "Registered patient");
    Ok(patient)
}

/// The first patient document belonging to `user_id`.
pub async fn fetch_patient_by_user(backend: &dyn RecordBackend, user_id: &str) -> Result<Value> {
    backend
        .list_documents(Collection::Patients, &[Query::equal("userId", user_id)])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("no patient record for user '{}'", user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;

    #[test]
    fn test_identification_fields_injected() {
        let document =
            registration_document(json!({"userId": "u-1", "name": "Jane"})).unwrap();
        assert_eq!(document["identificationDocumentId"], Value::Null);
        assert_eq!(document["identificationDocumentUrl"], Value::Null);
        assert_eq!(document["name"], "Jane");
    }

    #[test]
    fn test_caller_fields_win() {
        let document = registration_document(json!({
            "userId": "u-1",
            "identificationDocumentId": "file-9"
        }))
        .unwrap();
        assert_eq!(document["identificationDocumentId"], "file-9");
        assert_eq!(document["identificationDocumentUrl"], Value::Null);
    }

    #[test]
    fn test_requires_user_id() {
        assert!(matches!(
            registration_document(json!({"name": "Jane"})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            registration_document(json!({"userId": 7})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            registration_document(json!(["not", "an", "object"])),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_then_fetch() {
        let backend = MemoryBackend::new();
        let created = create_patient(&backend, json!({"userId": "u-1", "email": "j@example.com"}))
            .await
            .unwrap();

        let fetched = fetch_patient_by_user(&backend, "u-1").await.unwrap();
        assert_eq!(fetched["$id"], created["$id"]);

        assert!(matches!(
            fetch_patient_by_user(&backend, "u-2").await,
            Err(Error::NotFound(_))
        ));
    }
}
