use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use super::types::{Answer, HealthStatus, QueryRequest, QueryResponse, RemoteDocument, UploadFile, UploadReceipt};
use super::RagBackend;
use crate::config::Timeouts;
use crate::error::ApiError;

/// Keys the backend uses for a human-readable error in non-2xx bodies
const ERROR_MESSAGE_KEYS: [&str; 3] = ["message", "error", "detail"];

#[derive(Clone)]
pub struct RagClient {
    client: Client,
    base_url: String,
    timeouts: Timeouts,
}

impl RagClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, Timeouts::default())
    }

    pub fn with_timeouts(base_url: &str, timeouts: Timeouts) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        let url = format!("{}/health", self.base_url);
        tracing::debug!(%url, "health check");

        let timeout = self.timeouts.health;
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout, "Failed to connect to backend"))?;

        if !response.status().is_success() {
            return Err(ApiError::server(
                response.status().as_u16(),
                "Failed to connect to backend",
            ));
        }

        decode(response, timeout).await
    }

    pub async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt, ApiError> {
        let url = format!("{}/upload_pdf", self.base_url);
        tracing::info!(%url, file = %file.file_name, bytes = file.bytes.len(), "uploading document");

        let timeout = self.timeouts.upload;
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str("application/pdf")
            .map_err(|e| ApiError::network(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout, "Failed to connect to server"))?;

        if !response.status().is_success() {
            return Err(server_error(response, "Upload failed").await);
        }

        decode(response, timeout).await
    }

    pub async fn query(&self, doc_id: &str, query: &str) -> Result<Answer, ApiError> {
        let url = format!("{}/query", self.base_url);
        tracing::info!(%url, doc_id, "querying document");

        let timeout = self.timeouts.query;
        let request = QueryRequest { doc_id, query };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout, "Failed to connect to server"))?;

        if !response.status().is_success() {
            return Err(server_error(response, "Query failed").await);
        }

        let body: QueryResponse = decode(response, timeout).await?;
        Ok(Answer::from(body))
    }

    pub async fn list_documents(&self) -> Result<Vec<RemoteDocument>, ApiError> {
        let url = format!("{}/docs_list", self.base_url);

        let timeout = self.timeouts.health;
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout, "Failed to connect to backend"))?;

        if !response.status().is_success() {
            return Err(server_error(response, "Failed to fetch documents").await);
        }

        decode(response, timeout).await
    }

    /// The backend stores uploads as `uploads/{doc_id}_{filename}`; the joined
    /// name is encoded as a single path segment.
    pub fn preview_url(&self, doc_id: &str, filename: &str) -> String {
        let stored_name = format!("{}_{}", doc_id, filename);

        match Url::parse(&format!("{}/uploads/", self.base_url)) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(&stored_name);
                }
                url.to_string()
            }
            Err(e) => {
                tracing::warn!(base_url = %self.base_url, error = %e, "base URL does not parse");
                format!("{}/uploads/{}", self.base_url, stored_name)
            }
        }
    }
}

#[async_trait]
impl RagBackend for RagClient {
    async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        RagClient::check_health(self).await
    }

    async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt, ApiError> {
        RagClient::upload_document(self, file).await
    }

    async fn query(&self, doc_id: &str, query: &str) -> Result<Answer, ApiError> {
        RagClient::query(self, doc_id, query).await
    }

    async fn list_documents(&self) -> Result<Vec<RemoteDocument>, ApiError> {
        RagClient::list_documents(self).await
    }

    fn preview_url(&self, doc_id: &str, filename: &str) -> String {
        RagClient::preview_url(self, doc_id, filename)
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration, context: &str) -> ApiError {
    if err.is_timeout() {
        tracing::warn!(error = %err, "request timed out");
        ApiError::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        tracing::warn!(error = %err, "request failed before a response");
        ApiError::network(context)
    }
}

async fn server_error(response: Response, fallback: &str) -> ApiError {
    let status = response.status().as_u16();
    let body: Option<serde_json::Value> = response.json().await.ok();
    let message = body
        .as_ref()
        .and_then(extract_error_message)
        .unwrap_or_else(|| fallback.to_string());

    tracing::warn!(status, %message, "backend rejected request");
    ApiError::server(status, message)
}

fn extract_error_message(body: &serde_json::Value) -> Option<String> {
    ERROR_MESSAGE_KEYS.iter().find_map(|key| {
        body.get(*key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    })
}

async fn decode<T: DeserializeOwned>(response: Response, timeout: Duration) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            ApiError::Timeout {
                secs: timeout.as_secs(),
            }
        } else {
            ApiError::network(e.to_string())
        }
    })?;

    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}
