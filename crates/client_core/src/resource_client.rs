use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, RequestBuilder,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{Company, CompanyDraft, CompanyId},
    error::ErrorBody,
};
use tracing::{debug, warn};

use crate::error::RequestError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote operations on the company collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Message surfaced when the server gives no usable `detail`.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch companies",
            Operation::Get => "Failed to fetch company",
            Operation::Create => "Failed to create company",
            Operation::Update => "Failed to update company",
            Operation::Delete => "Failed to delete company",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Server acknowledgement of a delete. The payload is opaque; an empty body
/// is represented as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAck(pub Value);

#[async_trait]
pub trait CompanyApi: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Company>, RequestError>;
    async fn get_by_id(&self, id: CompanyId) -> Result<Company, RequestError>;
    async fn create(&self, draft: &CompanyDraft) -> Result<Company, RequestError>;
    async fn update(&self, id: CompanyId, draft: &CompanyDraft) -> Result<Company, RequestError>;
    async fn delete(&self, id: CompanyId) -> Result<DeleteAck, RequestError>;
}

pub struct HttpCompanyClient {
    http: Client,
    base_url: String,
}

impl HttpCompanyClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .context("failed to build company API http client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/companies", self.base_url)
    }

    fn record_url(&self, id: CompanyId) -> String {
        format!("{}/companies/{id}", self.base_url)
    }

    /// Sends the request and returns the raw success body, normalizing every
    /// failure into a [`RequestError`].
    async fn execute(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<Vec<u8>, RequestError> {
        let response = request.send().await.map_err(|err| {
            warn!(
                operation = operation.name(),
                timed_out = err.is_timeout(),
                "company api: transport failure: {err}"
            );
            RequestError::new(operation.fallback_message())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|body| body.message());
            warn!(
                operation = operation.name(),
                status = status.as_u16(),
                detail = detail.as_deref().unwrap_or(""),
                "company api: request rejected"
            );
            let message = detail.unwrap_or_else(|| operation.fallback_message().to_string());
            return Err(RequestError::with_status(message, status.as_u16()));
        }

        let body = response.bytes().await.map_err(|err| {
            warn!(
                operation = operation.name(),
                "company api: failed to read response body: {err}"
            );
            RequestError::new(operation.fallback_message())
        })?;
        debug!(
            operation = operation.name(),
            status = status.as_u16(),
            bytes = body.len(),
            "company api: request succeeded"
        );
        Ok(body.to_vec())
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T, RequestError> {
        let body = self.execute(operation, request).await?;
        decode(operation, &body)
    }
}

fn decode<T: DeserializeOwned>(operation: Operation, body: &[u8]) -> Result<T, RequestError> {
    serde_json::from_slice(body).map_err(|err| {
        warn!(
            operation = operation.name(),
            "company api: malformed response body: {err}"
        );
        RequestError::new(operation.fallback_message())
    })
}

#[async_trait]
impl CompanyApi for HttpCompanyClient {
    async fn list_all(&self) -> Result<Vec<Company>, RequestError> {
        self.execute_json(Operation::List, self.http.get(self.collection_url()))
            .await
    }

    async fn get_by_id(&self, id: CompanyId) -> Result<Company, RequestError> {
        self.execute_json(Operation::Get, self.http.get(self.record_url(id)))
            .await
    }

    async fn create(&self, draft: &CompanyDraft) -> Result<Company, RequestError> {
        self.execute_json(
            Operation::Create,
            self.http.post(self.collection_url()).json(draft),
        )
        .await
    }

    async fn update(&self, id: CompanyId, draft: &CompanyDraft) -> Result<Company, RequestError> {
        self.execute_json(
            Operation::Update,
            self.http.put(self.record_url(id)).json(draft),
        )
        .await
    }

    async fn delete(&self, id: CompanyId) -> Result<DeleteAck, RequestError> {
        let body = self
            .execute(Operation::Delete, self.http.delete(self.record_url(id)))
            .await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(DeleteAck(Value::Null));
        }
        decode(Operation::Delete, &body).map(DeleteAck)
    }
}

#[cfg(test)]
#[path = "tests/resource_client_tests.rs"]
mod tests;
