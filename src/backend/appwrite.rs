//! Hosted backend over its REST API

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};

use crate::{Error, Result};

use super::{AppwriteConfig, Collection, NewUser, Query, RecordBackend};

/// Id placeholder asking the service to generate a unique id
const UNIQUE_ID: &str = "unique()";

/// REST client for the hosted identity and document stores
pub struct AppwriteBackend {
    client: Client,
    config: AppwriteConfig,
}

impl AppwriteBackend {
    pub fn new(config: AppwriteConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Appwrite-Project", header_value(&config.project_id)?);
        headers.insert("X-Appwrite-Key", header_value(&config.api_key)?);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn documents_url(&self, collection: Collection) -> String {
        self.url(&format!(
            "/databases/{}/collections/{}/documents",
            self.config.database_id,
            self.config.collection_id(collection)
        ))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);

        tracing::debug!(status = status.as_u16(), %message, "Upstream request failed");
        Err(Error::from_upstream(status.as_u16(), message))
    }
}

#[async_trait]
impl RecordBackend for AppwriteBackend {
    async fn get_user(&self, user_id: &str) -> Result<Value> {
        let request = self.client.get(self.url(&format!("/users/{}", user_id)));
        self.send(request).await
    }

    async fn list_users(&self, queries: &[Query]) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.url("/users"))
            .query(&query_params(queries));
        let body = self.send(request).await?;
        take_list(body, "users")
    }

    async fn create_user(&self, user: &NewUser) -> Result<Value> {
        let mut body = json!({
            "userId": UNIQUE_ID,
            "email": user.email,
            "name": user.name,
        });
        if let Some(phone) = &user.phone {
            body["phone"] = Value::String(phone.clone());
        }

        let request = self.client.post(self.url("/users")).json(&body);
        self.send(request).await
    }

    async fn list_documents(
        &self,
        collection: Collection,
        queries: &[Query],
    ) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.documents_url(collection))
            .query(&query_params(queries));
        let body = self.send(request).await?;
        take_list(body, "documents")
    }

    async fn create_document(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> Result<Value> {
        let body = json!({
            "documentId": UNIQUE_ID,
            "data": data,
        });

        let request = self.client.post(self.documents_url(collection)).json(&body);
        self.send(request).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Config(format!("invalid header value: {}", e)))
}

fn query_params(queries: &[Query]) -> Vec<(&'static str, String)> {
    queries.iter().map(|q| ("queries[]", q.to_wire())).collect()
}

/// Strip the list wrapper from a list response
fn take_list(mut body: Value, key: &str) -> Result<Vec<Value>> {
    match body.get_mut(key).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(Error::internal(format!(
            "upstream response is missing the '{}' list",
            key
        ))),
    }
}
