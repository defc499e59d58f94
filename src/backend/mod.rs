//! Record access layer
//!
//! Provides a unified interface over the hosted identity and document
//! stores, with an in-process implementation for development and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

pub mod appwrite;
pub mod memory;
pub mod query;

pub use query::Query;

/// Document collections the service reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Patients,
    Appointments,
}

/// Fields accepted when creating an identity-store user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub name: String,
}

/// Record backend trait
///
/// Every method forwards its arguments unchanged and returns plain JSON,
/// with list wrappers (`total`, `documents`, `users`) removed.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Fetch a user account by id
    async fn get_user(&self, user_id: &str) -> Result<Value>;

    /// List user accounts matching the queries
    async fn list_users(&self, queries: &[Query]) -> Result<Vec<Value>>;

    /// Create a user account with a service-generated id
    async fn create_user(&self, user: &NewUser) -> Result<Value>;

    /// List documents of a collection matching the queries
    async fn list_documents(&self, collection: Collection, queries: &[Query])
        -> Result<Vec<Value>>;

    /// Create a document with a service-generated id
    async fn create_document(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> Result<Value>;
}

/// Connection settings for the hosted backend
#[derive(Debug, Clone)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
    pub patient_collection_id: String,
    pub appointment_collection_id: String,
    pub bucket_id: Option<String>,
}

impl AppwriteConfig {
    pub fn collection_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Patients => &self.patient_collection_id,
            Collection::Appointments => &self.appointment_collection_id,
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Appwrite(AppwriteConfig),
    Memory,
}

/// Create record backend from config
pub fn create_backend(config: BackendConfig) -> Result<Box<dyn RecordBackend>> {
    match config {
        BackendConfig::Appwrite(config) => {
            let backend = appwrite::AppwriteBackend::new(config)?;
            Ok(Box::new(backend))
        }
        BackendConfig::Memory => Ok(Box::new(memory::MemoryBackend::new())),
    }
}
