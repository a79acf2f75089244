//! Scripted in-memory backend for driving the session in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{Answer, HealthStatus, RagBackend, RemoteDocument, UploadFile, UploadReceipt};
use crate::error::ApiError;

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    health: Mutex<VecDeque<Result<HealthStatus, ApiError>>>,
    uploads: Mutex<VecDeque<Result<UploadReceipt, ApiError>>>,
    answers: Mutex<VecDeque<Result<Answer, ApiError>>>,
    pub upload_delay: Duration,
    pub query_delay: Duration,
    pub health_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub queries: Mutex<Vec<(String, String)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    pub fn push_health(&self, result: Result<HealthStatus, ApiError>) {
        self.health.lock().unwrap().push_back(result);
    }

    pub fn push_upload(&self, result: Result<UploadReceipt, ApiError>) {
        self.uploads.lock().unwrap().push_back(result);
    }

    pub fn accept_upload(&self, doc_id: &str, filename: &str) {
        self.push_upload(Ok(UploadReceipt {
            doc_id: doc_id.to_string(),
            filename: Some(filename.to_string()),
            status: Some("success".to_string()),
            message: Some("PDF processed successfully.".to_string()),
        }));
    }

    pub fn push_answer(&self, result: Result<Answer, ApiError>) {
        self.answers.lock().unwrap().push_back(result);
    }

    pub fn uploads_made(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn queries_made(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RagBackend for ScriptedBackend {
    async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.health.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(HealthStatus {
                status: "ok".to_string(),
                backend: "running".to_string(),
            })
        })
    }

    async fn upload_document(&self, _file: UploadFile) -> Result<UploadReceipt, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        let next = self.uploads.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ApiError::network("Failed to connect to server")))
    }

    async fn query(&self, doc_id: &str, query: &str) -> Result<Answer, ApiError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((doc_id.to_string(), query.to_string()));
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
        let next = self.answers.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ApiError::network("Failed to connect to server")))
    }

    async fn list_documents(&self) -> Result<Vec<RemoteDocument>, ApiError> {
        Ok(Vec::new())
    }

    fn preview_url(&self, doc_id: &str, filename: &str) -> String {
        format!("http://backend.test/uploads/{}_{}", doc_id, filename)
    }
}
