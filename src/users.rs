//! User accounts: lookup and email-idempotent creation

use serde::Deserialize;
use serde_json::Value;

use crate::backend::{NewUser, Query, RecordBackend};
use crate::error::FieldErrors;
use crate::{Error, Result};

/// Incoming body of a create-user request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CreateUserRequest {
    /// Check required fields and formats, collecting every problem.
    pub fn validate(self) -> Result<NewUser> {
        let mut errors = FieldErrors::new();

        let email = self.email.map(|e| e.trim().to_string()).unwrap_or_default();
        if email.is_empty() {
            errors.add("email", "is required");
        } else if !is_email(&email) {
            errors.add("email", "is not a valid email address");
        }

        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            errors.add("name", "is required");
        }

        let phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if let Some(phone) = &phone {
            if !is_phone(phone) {
                errors.add("phone", "must be '+' followed by 8 to 15 digits");
            }
        }

        errors.into_result()?;
        Ok(NewUser { email, phone, name })
    }
}

fn is_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn is_phone(phone: &str) -> bool {
    match phone.strip_prefix('+') {
        Some(digits) => {
            (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// A user account and whether it existed before the request
#[derive(Debug, Clone, PartialEq)]
pub struct UserOutcome {
    pub user: Value,
    pub is_member: bool,
}

impl UserOutcome {
    /// The user JSON with an `isMember` flag added.
    pub fn into_json(self) -> Value {
        let mut user = self.user;
        if let Value::Object(fields) = &mut user {
            fields.insert("isMember".to_string(), Value::Bool(self.is_member));
        }
        user
    }
}

/// The request field named in an identity-store rejection such as
/// "Invalid `phone` param: ...", or `user` when none is named.
pub fn rejected_field(message: &str) -> &str {
    message
        .split('`')
        .nth(1)
        .filter(|name| {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
        .unwrap_or("user")
}

pub async fn fetch_user(backend: &dyn RecordBackend, user_id: &str) -> Result<Value> {
    backend.get_user(user_id).await
}

pub async fn find_user_by_email(backend: &dyn RecordBackend, email: &str) -> Result<Option<Value>> {
    let mut users = backend.list_users(&[Query::equal("email", email)]).await?;
    Ok(if users.is_empty() {
        None
    } else {
        Some(users.swap_remove(0))
    })
}

/// Return the existing user for this email, or create one.
///
/// A conflict from the identity store is resolved by looking the email up
/// again; if it still cannot be found (e.g. the phone number is taken by
/// another account) the conflict is returned.
pub async fn create_user(backend: &dyn RecordBackend, new_user: &NewUser) -> Result<UserOutcome> {
    if let Some(user) = find_user_by_email(backend, &new_user.email).await? {
        tracing::debug!(email = %new_user.email, "User already registered");
        return Ok(UserOutcome {
            user,
            is_member: true,
        });
    }

    match backend.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = ?user.get("$id"), "Created user");
            Ok(UserOutcome {
                user,
                is_member: false,
            })
        }
        Err(Error::Conflict(message)) => match find_user_by_email(backend, &new_user.email).await? {
            Some(user) => Ok(UserOutcome {
                user,
                is_member: true,
            }),
            None => Err(Error::Conflict(message)),
        },
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Map};

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::Collection;

    /// Identity store whose email lookups answer from a script and whose
    /// create call always fails with the configured error.
    struct ScriptedBackend {
        lookups: Mutex<VecDeque<Vec<Value>>>,
        create_error: fn() -> Error,
    }

    impl ScriptedBackend {
        fn new(lookups: Vec<Vec<Value>>, create_error: fn() -> Error) -> Self {
            Self {
                lookups: Mutex::new(lookups.into()),
                create_error,
            }
        }
    }

    #[async_trait]
    impl RecordBackend for ScriptedBackend {
        async fn get_user(&self, user_id: &str) -> Result<Value> {
            Err(Error::not_found(user_id))
        }

        async fn list_users(&self, _queries: &[Query]) -> Result<Vec<Value>> {
            Ok(self.lookups.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn create_user(&self, _user: &NewUser) -> Result<Value> {
            Err((self.create_error)())
        }

        async fn list_documents(&self, _: Collection, _: &[Query]) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn create_document(&self, _: Collection, _: Map<String, Value>) -> Result<Value> {
            Err(Error::internal("documents are not scripted"))
        }
    }

    fn duplicate() -> Error {
        Error::from_upstream(409, "A user with the same id, email, or phone already exists.")
    }

    fn request(email: &str, phone: Option<&str>, name: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: Some(email.to_string()),
            phone: phone.map(str::to_string),
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        let user = request(" jane@example.com ", Some("+15555550100"), "Jane")
            .validate()
            .unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.phone.as_deref(), Some("+15555550100"));
    }

    #[test]
    fn test_validate_reports_each_field() {
        let err = CreateUserRequest {
            email: Some("no-at-sign".to_string()),
            phone: Some("5555".to_string()),
            name: None,
        }
        .validate()
        .unwrap_err();

        let Error::Validation(fields) = err else {
            panic!("expected validation error");
        };
        let names: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["email", "name", "phone"]);
    }

    #[test]
    fn test_blank_phone_is_treated_as_absent() {
        let user = request("jane@example.com", Some("  "), "Jane")
            .validate()
            .unwrap();
        assert!(user.phone.is_none());
    }

    #[tokio::test]
    async fn test_create_user_is_idempotent_on_email() {
        let backend = MemoryBackend::new();
        let new_user = request("jane@example.com", None, "Jane").validate().unwrap();

        let first = create_user(&backend, &new_user).await.unwrap();
        assert!(!first.is_member);

        let second = create_user(&backend, &new_user).await.unwrap();
        assert!(second.is_member);
        assert_eq!(second.user["$id"], first.user["$id"]);
    }

    #[tokio::test]
    async fn test_conflict_resolves_to_raced_user() {
        let raced = json!({"$id": "u-7", "email": "jane@example.com"});
        let backend = ScriptedBackend::new(vec![vec![], vec![raced]], duplicate);
        let new_user = request("jane@example.com", None, "Jane").validate().unwrap();

        let outcome = create_user(&backend, &new_user).await.unwrap();
        assert!(outcome.is_member);
        assert_eq!(outcome.user["$id"], "u-7");
    }

    #[tokio::test]
    async fn test_conflict_without_user_is_returned() {
        let backend = ScriptedBackend::new(vec![vec![], vec![]], duplicate);
        let new_user = request("jane@example.com", Some("+15555550100"), "Jane")
            .validate()
            .unwrap();

        match create_user(&backend, &new_user).await {
            Err(Error::Conflict(message)) => assert!(message.contains("already exists")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_create_is_not_retried() {
        let backend = ScriptedBackend::new(vec![vec![]], || {
            Error::from_upstream(400, "Invalid `phone` param: Phone number must start with a '+'")
        });
        let new_user = request("jane@example.com", None, "Jane").validate().unwrap();

        assert!(matches!(
            create_user(&backend, &new_user).await,
            Err(Error::InvalidRequest(_))
        ));
        assert!(backend.lookups.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejected_field_names_the_param() {
        assert_eq!(
            rejected_field("Invalid `phone` param: Phone number must start with a '+'"),
            "phone"
        );
        assert_eq!(rejected_field("Invalid `email` param: Value must be a valid email"), "email");
        assert_eq!(rejected_field("Password is too short"), "user");
        assert_eq!(rejected_field("Odd `multi word` quoting"), "user");
    }

    #[test]
    fn test_outcome_json_carries_membership() {
        let outcome = UserOutcome {
            user: serde_json::json!({"$id": "u-1"}),
            is_member: true,
        };
        let json = outcome.into_json();
        assert_eq!(json["$id"], "u-1");
        assert_eq!(json["isMember"], true);
    }
}
