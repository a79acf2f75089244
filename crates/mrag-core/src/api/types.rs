use serde::{Deserialize, Serialize};

use crate::state::Citation;

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub backend: String,
}

/// `POST /upload_pdf` success body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub doc_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub doc_id: &'a str,
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub context: Vec<ContextChunk>,
}

/// One retrieved chunk in a query response. Only chunks with a page become
/// citations.
#[derive(Debug, Deserialize)]
pub(crate) struct ContextChunk {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// A normalized answer to a question
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

impl From<QueryResponse> for Answer {
    fn from(response: QueryResponse) -> Self {
        let answer = if response.answer.trim().is_empty() {
            "No response received".to_string()
        } else {
            response.answer
        };

        let citations = response
            .context
            .into_iter()
            .filter_map(|chunk| {
                chunk.page.map(|page| Citation {
                    page,
                    excerpt: chunk.text,
                    score: chunk.score,
                })
            })
            .collect();

        Self { answer, citations }
    }
}

/// `GET /docs_list` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteDocument {
    pub doc_id: String,
    pub filename: String,
}

/// A PDF picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}
