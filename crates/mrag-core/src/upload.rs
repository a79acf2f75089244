//! Upload lifecycle: validate, transfer with a synthetic progress bar,
//! then register the new document after a short pause.

use std::path::Path;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::api::{UploadFile, UploadReceipt};
use crate::conversation::ConversationLog;
use crate::documents::DocumentSession;
use crate::error::ApiError;
use crate::event::SessionEvent;
use crate::notifications::NotificationQueue;
use crate::session::SessionContext;
use crate::state::Document;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    /// Request in flight; progress is synthetic and capped
    Transferring,
    /// Server accepted the file; waiting out the activation delay
    Completing,
    Succeeded,
}

/// Why an upload never reached the network
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("An upload is already in progress")]
    Busy,
    #[error("{file_name} is not a PDF. Only PDF files are supported")]
    NotPdf { file_name: String },
    #[error("{file_name} is empty")]
    Empty { file_name: String },
    #[error("Could not read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Read a file from disk for upload. Does not validate it.
pub async fn read_upload_file(path: &Path) -> Result<UploadFile, UploadRejection> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| UploadRejection::Unreadable {
            path: path.display().to_string(),
            reason: "not a file".to_string(),
        })?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| UploadRejection::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(UploadFile::new(file_name, bytes))
}

/// Accept only non-empty files named `*.pdf` that carry the PDF signature.
pub fn validate_pdf(file: &UploadFile) -> Result<(), UploadRejection> {
    let has_pdf_extension = Path::new(&file.file_name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if !has_pdf_extension {
        return Err(UploadRejection::NotPdf {
            file_name: file.file_name.clone(),
        });
    }
    if file.bytes.is_empty() {
        return Err(UploadRejection::Empty {
            file_name: file.file_name.clone(),
        });
    }
    if !file.bytes.starts_with(PDF_SIGNATURE) {
        return Err(UploadRejection::NotPdf {
            file_name: file.file_name.clone(),
        });
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct UploadController {
    phase: UploadPhase,
    progress: u8,
    attempt: u64,
    last_error: Option<String>,
    ticker: Option<JoinHandle<()>>,
}

impl UploadController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    /// Percentage shown on the progress bar
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.phase, UploadPhase::Transferring | UploadPhase::Completing)
    }

    /// Reason the previous attempt failed, cleared when a new one starts
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start an attempt. Precondition failures other than `Busy` are
    /// reported through `notifications`.
    pub fn begin(
        &mut self,
        ctx: &SessionContext,
        notifications: &mut NotificationQueue,
        file: UploadFile,
    ) -> Result<u64, UploadRejection> {
        if self.is_uploading() {
            tracing::debug!("upload rejected: another upload is in flight");
            return Err(UploadRejection::Busy);
        }
        if let Err(rejection) = validate_pdf(&file) {
            tracing::info!(file = %file.file_name, %rejection, "upload rejected locally");
            notifications.error(rejection.to_string());
            return Err(rejection);
        }

        self.attempt += 1;
        self.phase = UploadPhase::Transferring;
        self.progress = 0;
        self.last_error = None;

        let attempt = self.attempt;
        tracing::info!(attempt, file = %file.file_name, "upload started");

        // Synthetic progress while the request is in flight
        let tx = ctx.events.clone();
        let period = ctx.timings.progress_interval;
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(SessionEvent::UploadProgress { attempt }).is_err() {
                    break;
                }
            }
        }));

        let tx = ctx.events.clone();
        let backend = ctx.backend.clone();
        let file_name = file.file_name.clone();
        tokio::spawn(async move {
            let result = backend.upload_document(file).await;
            let _ = tx.send(SessionEvent::UploadFinished {
                attempt,
                file_name,
                result,
            });
        });

        Ok(attempt)
    }

    pub fn on_progress(&mut self, ctx: &SessionContext, attempt: u64) {
        if attempt != self.attempt || self.phase != UploadPhase::Transferring {
            return;
        }
        let ceiling = ctx.timings.progress_ceiling;
        let next = self.progress.saturating_add(ctx.timings.progress_step).min(ceiling);
        self.progress = self.progress.max(next);
    }

    pub fn on_finished(
        &mut self,
        ctx: &SessionContext,
        notifications: &mut NotificationQueue,
        attempt: u64,
        file_name: String,
        result: Result<UploadReceipt, ApiError>,
    ) {
        if attempt != self.attempt || self.phase != UploadPhase::Transferring {
            tracing::debug!(attempt, "ignoring result of a superseded upload");
            return;
        }
        self.stop_ticker();

        match result {
            Ok(receipt) => {
                tracing::info!(attempt, doc_id = %receipt.doc_id, "upload accepted");
                self.progress = 100;
                self.phase = UploadPhase::Completing;

                let display_name = receipt
                    .filename
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(file_name);
                let document = Document::new(receipt.doc_id, display_name);

                let tx = ctx.events.clone();
                let delay = ctx.timings.activation_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(SessionEvent::UploadActivate { attempt, document });
                });
            }
            Err(err) => {
                tracing::warn!(attempt, error = %err, "upload failed");
                self.progress = 0;
                self.phase = UploadPhase::Idle;
                let reason = err.to_string();
                notifications.error(reason.clone());
                self.last_error = Some(reason);
            }
        }
    }

    /// Returns true when the document was registered
    pub fn on_activate(
        &mut self,
        documents: &mut DocumentSession,
        log: &mut ConversationLog,
        notifications: &mut NotificationQueue,
        attempt: u64,
        document: Document,
    ) -> bool {
        if attempt != self.attempt || self.phase != UploadPhase::Completing {
            return false;
        }

        let name = document.display_name.clone();
        documents.register_upload(document, log);
        notifications.success(format!("{} uploaded and processed successfully", name));
        self.phase = UploadPhase::Succeeded;
        true
    }

    /// Back to the idle screen state after a completed upload
    pub fn reset(&mut self) {
        if !self.is_uploading() {
            self.phase = UploadPhase::Idle;
            self.progress = 0;
            self.last_error = None;
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for UploadController {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
