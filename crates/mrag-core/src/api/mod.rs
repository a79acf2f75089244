pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::ApiError;

pub use client::RagClient;
pub use types::{Answer, HealthStatus, RemoteDocument, UploadFile, UploadReceipt};

/// The backend operations the session depends on.
///
/// [`RagClient`] is the HTTP implementation; tests drive the session with a
/// scripted one.
#[async_trait]
pub trait RagBackend: Send + Sync {
    async fn check_health(&self) -> Result<HealthStatus, ApiError>;

    async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt, ApiError>;

    async fn query(&self, doc_id: &str, query: &str) -> Result<Answer, ApiError>;

    async fn list_documents(&self) -> Result<Vec<RemoteDocument>, ApiError>;

    /// URL the backend serves the stored PDF from
    fn preview_url(&self, doc_id: &str, filename: &str) -> String;
}
