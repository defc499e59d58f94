//! In-process record backend
//!
//! Mirrors the hosted service closely enough for local development and
//! tests: generated ids, `$createdAt` stamps, query evaluation, 404 for
//! unknown users and 409 for duplicate emails.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

use super::{query, Collection, NewUser, Query, RecordBackend};

/// In-memory identity and document stores
#[derive(Default)]
pub struct MemoryBackend {
    users: DashMap<String, Value>,
    collections: DashMap<Collection, Vec<Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document as-is, keeping any `$id`/`$createdAt` it carries.
    pub fn insert_document(&self, collection: Collection, document: Value) -> Value {
        let document = stamp(document);
        self.collections
            .entry(collection)
            .or_default()
            .push(document.clone());
        document
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn get_user(&self, user_id: &str) -> Result<Value> {
        self.users
            .get(user_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::not_found(format!("user '{}' could not be found", user_id)))
    }

    async fn list_users(&self, queries: &[Query]) -> Result<Vec<Value>> {
        let users: Vec<Value> = self.users.iter().map(|e| e.value().clone()).collect();
        Ok(query::apply(users, queries))
    }

    async fn create_user(&self, user: &NewUser) -> Result<Value> {
        let email_taken = self
            .users
            .iter()
            .any(|e| e.value().get("email").and_then(Value::as_str) == Some(user.email.as_str()));
        if email_taken {
            return Err(Error::conflict(
                "A user with the same id, email, or phone already exists",
            ));
        }

        let record = stamp(serde_json::to_value(user)?);
        let id = record["$id"].as_str().unwrap_or_default().to_string();
        self.users.insert(id, record.clone());
        Ok(record)
    }

    async fn list_documents(
        &self,
        collection: Collection,
        queries: &[Query],
    ) -> Result<Vec<Value>> {
        let documents = self
            .collections
            .get(&collection)
            .map(|docs| docs.value().clone())
            .unwrap_or_default();
        Ok(query::apply(documents, queries))
    }

    async fn create_document(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> Result<Value> {
        let mut data = data;
        data.remove("$id");
        data.remove("$createdAt");
        Ok(self.insert_document(collection, Value::Object(data)))
    }
}

/// Fill in service metadata the record does not carry yet.
fn stamp(mut record: Value) -> Value {
    if let Value::Object(fields) = &mut record {
        fields
            .entry("$id")
            .or_insert_with(|| Value::String(Uuid::new_v4().simple().to_string()));
        fields.entry("$createdAt").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
        });
    }
    record
}
