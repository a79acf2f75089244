//! The client session: one document collection, one conversation, one
//! notification queue, and the controllers that move them.
//!
//! All mutation happens on the thread that owns the [`Session`]. Backend
//! calls and timers run as spawned tasks that report back through the
//! [`EventReceiver`] returned by [`Session::new`]; the owner feeds each
//! event to [`Session::apply`] in order.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{RagBackend, UploadFile};
use crate::config::Timings;
use crate::conversation::{ConversationLog, TurnTicket};
use crate::documents::DocumentSession;
use crate::event::{EventReceiver, EventSender, SessionEvent};
use crate::notifications::NotificationQueue;
use crate::query::{QueryController, QueryRejection};
use crate::state::{ChatMessage, Connectivity, Document, Notification, NotificationId};
use crate::upload::{read_upload_file, UploadController, UploadPhase, UploadRejection};

pub const HEALTH_OK_MESSAGE: &str = "Connected to backend successfully";
pub const HEALTH_FAILED_MESSAGE: &str = "Failed to connect to backend. Please ensure the API is running.";

/// What the controllers get to see of the session besides the state they
/// mutate.
pub struct SessionContext {
    pub backend: Arc<dyn RagBackend>,
    pub events: EventSender,
    pub connectivity: Connectivity,
    pub timings: Timings,
}

pub struct Session {
    ctx: SessionContext,
    documents: DocumentSession,
    log: ConversationLog,
    notifications: NotificationQueue,
    upload: UploadController,
    query: QueryController,
    health_check: u64,
    remote_documents: Option<usize>,
}

impl Session {
    pub fn new(backend: Arc<dyn RagBackend>, timings: Timings) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifications = NotificationQueue::new(timings.notification_lifetime, tx.clone());

        let session = Self {
            ctx: SessionContext {
                backend,
                events: tx,
                connectivity: Connectivity::Checking,
                timings,
            },
            documents: DocumentSession::new(),
            log: ConversationLog::new(),
            notifications,
            upload: UploadController::new(),
            query: QueryController::new(),
            health_check: 0,
            remote_documents: None,
        };
        (session, rx)
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.ctx.connectivity = connectivity;
        self
    }

    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        self.ctx.connectivity = connectivity;
    }

    // Connectivity

    /// Probe the backend. Connectivity reads `Checking` until the result is
    /// applied; results of earlier probes are ignored.
    pub fn check_health(&mut self) {
        self.ctx.connectivity = Connectivity::Checking;
        self.health_check += 1;
        let check = self.health_check;

        let tx = self.ctx.events.clone();
        let backend = self.ctx.backend.clone();
        tokio::spawn(async move {
            let result = backend.check_health().await;
            let _ = tx.send(SessionEvent::HealthChecked { check, result });
        });
    }

    pub fn retry_connection(&mut self) {
        tracing::info!("retrying backend connection");
        self.check_health();
    }

    pub fn refresh_remote_documents(&self) {
        let tx = self.ctx.events.clone();
        let backend = self.ctx.backend.clone();
        tokio::spawn(async move {
            let result = backend.list_documents().await;
            let _ = tx.send(SessionEvent::DocumentsListed(result));
        });
    }

    // Actions

    pub fn upload(&mut self, file: UploadFile) -> Result<u64, UploadRejection> {
        self.upload.begin(&self.ctx, &mut self.notifications, file)
    }

    /// Read `path` and upload it. Unreadable paths are reported like any
    /// other local rejection.
    pub async fn upload_path(&mut self, path: &Path) -> Result<u64, UploadRejection> {
        if self.upload.is_uploading() {
            return Err(UploadRejection::Busy);
        }
        match read_upload_file(path).await {
            Ok(file) => self.upload(file),
            Err(rejection) => {
                self.notifications.error(rejection.to_string());
                Err(rejection)
            }
        }
    }

    /// Clear a finished or failed upload so a new file can be picked
    pub fn reset_upload(&mut self) {
        self.upload.reset();
    }

    pub fn submit_query(&mut self, text: &str) -> Result<TurnTicket, QueryRejection> {
        self.query.submit(
            &self.ctx,
            &self.documents,
            &mut self.log,
            &mut self.notifications,
            text,
        )
    }

    pub fn select_document(&mut self, index: usize) -> bool {
        self.documents.select(index, &mut self.log)
    }

    pub fn dismiss_notification(&mut self, id: NotificationId) -> bool {
        self.notifications.dismiss(id)
    }

    pub fn notify_info(&mut self, text: impl Into<String>) -> NotificationId {
        self.notifications.info(text)
    }

    pub fn notify_error(&mut self, text: impl Into<String>) -> NotificationId {
        self.notifications.error(text)
    }

    /// Apply one completion. Runs to completion before the next event.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::HealthChecked { check, result } => {
                if check != self.health_check {
                    return;
                }
                match result {
                    Ok(status) => {
                        tracing::info!(status = %status.status, backend = %status.backend, "backend online");
                        self.ctx.connectivity = Connectivity::Online;
                        self.notifications.success(HEALTH_OK_MESSAGE);
                        self.refresh_remote_documents();
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "backend offline");
                        self.ctx.connectivity = Connectivity::Offline;
                        self.notifications.error(HEALTH_FAILED_MESSAGE);
                    }
                }
            }
            SessionEvent::DocumentsListed(result) => match result {
                Ok(documents) => {
                    tracing::debug!(count = documents.len(), "backend documents listed");
                    self.remote_documents = Some(documents.len());
                }
                Err(err) => {
                    tracing::warn!(error = %err, "could not list backend documents");
                    self.notifications
                        .info(format!("Could not list backend documents: {}", err));
                }
            },
            SessionEvent::UploadProgress { attempt } => {
                self.upload.on_progress(&self.ctx, attempt);
            }
            SessionEvent::UploadFinished {
                attempt,
                file_name,
                result,
            } => {
                self.upload.on_finished(
                    &self.ctx,
                    &mut self.notifications,
                    attempt,
                    file_name,
                    result,
                );
            }
            SessionEvent::UploadActivate { attempt, document } => {
                let registered = self.upload.on_activate(
                    &mut self.documents,
                    &mut self.log,
                    &mut self.notifications,
                    attempt,
                    document,
                );
                if registered {
                    self.refresh_remote_documents();
                }
            }
            SessionEvent::QueryFinished { turn, result } => {
                self.query
                    .on_finished(&mut self.log, &mut self.notifications, turn, result);
            }
            SessionEvent::NotificationExpired(id) => {
                self.notifications.expire(id);
            }
        }
    }

    // Read-only projection for the view

    pub fn connectivity(&self) -> Connectivity {
        self.ctx.connectivity
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.is_uploading()
    }

    pub fn is_querying(&self) -> bool {
        self.query.is_querying()
    }

    /// Whether the chat input should accept a question right now
    pub fn can_query(&self) -> bool {
        self.documents.active().is_some()
            && !self.is_querying()
            && self.ctx.connectivity != Connectivity::Offline
    }

    pub fn upload_phase(&self) -> UploadPhase {
        self.upload.phase()
    }

    pub fn upload_progress(&self) -> u8 {
        self.upload.progress()
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload.last_error()
    }

    pub fn documents(&self) -> &[Document] {
        self.documents.documents()
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.documents.active()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.documents.active_index()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.log.messages()
    }

    pub fn last_reply(&self) -> Option<&ChatMessage> {
        self.log.last_reply()
    }

    pub fn is_provisional(&self, message: &ChatMessage) -> bool {
        self.log.is_provisional(message.id)
    }

    pub fn notifications(&self) -> &[Notification] {
        self.notifications.items()
    }

    pub fn latest_notification(&self) -> Option<&Notification> {
        self.notifications.latest()
    }

    /// Number of documents the backend reported holding, once listed
    pub fn remote_document_count(&self) -> Option<usize> {
        self.remote_documents
    }

    pub fn preview_url(&self) -> Option<String> {
        self.documents
            .active()
            .map(|doc| self.ctx.backend.preview_url(&doc.id, &doc.display_name))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::Answer;
    use crate::error::ApiError;
    use crate::query::{FAILED_REPLY, NO_DOCUMENT_MESSAGE};
    use crate::state::{ChatRole, Citation, NotificationKind};
    use crate::testing::ScriptedBackend;

    fn pdf(name: &str) -> UploadFile {
        UploadFile::new(name, b"%PDF-1.7\n1 0 obj\n%%EOF".to_vec())
    }

    fn session(backend: ScriptedBackend) -> (Session, EventReceiver, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let (session, rx) = Session::new(backend.clone(), Timings::default());
        (session.with_connectivity(Connectivity::Online), rx, backend)
    }

    /// Apply events in arrival order until one matching `done` is applied.
    async fn apply_until(
        session: &mut Session,
        rx: &mut EventReceiver,
        done: impl Fn(&SessionEvent) -> bool,
    ) {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            let stop = done(&event);
            session.apply(event);
            if stop {
                break;
            }
        }
    }

    fn is_activation(event: &SessionEvent) -> bool {
        matches!(event, SessionEvent::UploadActivate { .. })
    }

    fn is_upload_result(event: &SessionEvent) -> bool {
        matches!(event, SessionEvent::UploadFinished { .. })
    }

    fn is_answer(event: &SessionEvent) -> bool {
        matches!(event, SessionEvent::QueryFinished { .. })
    }

    fn errors(session: &Session) -> Vec<String> {
        session
            .notifications()
            .iter()
            .filter(|n| n.kind == NotificationKind::Error)
            .map(|n| n.text.clone())
            .collect()
    }

    async fn with_document(session: &mut Session, rx: &mut EventReceiver, backend: &ScriptedBackend, id: &str, name: &str) {
        backend.accept_upload(id, name);
        session.upload(pdf(name)).unwrap();
        apply_until(session, rx, is_activation).await;
    }

    // Upload

    #[tokio::test(start_paused = true)]
    async fn test_upload_report_pdf() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        backend.accept_upload("d1", "report.pdf");

        session.upload(pdf("report.pdf")).unwrap();
        assert!(session.is_uploading());
        assert_eq!(session.upload_progress(), 0);

        apply_until(&mut session, &mut rx, is_activation).await;

        assert_eq!(session.documents().len(), 1);
        assert_eq!(session.documents()[0].id, "d1");
        assert_eq!(session.documents()[0].display_name, "report.pdf");
        assert_eq!(session.active_document().map(|d| d.id.as_str()), Some("d1"));
        assert!(session.messages().is_empty());
        assert!(!session.is_uploading());
        assert_eq!(session.upload_progress(), 100);
        assert_eq!(session.upload_phase(), UploadPhase::Succeeded);
        assert_eq!(
            session.latest_notification().map(|n| (n.kind, n.text.as_str())),
            Some((NotificationKind::Success, "report.pdf uploaded and processed successfully"))
        );
        assert_eq!(backend.uploads_made(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_monotonic_and_capped_until_response() {
        let backend = ScriptedBackend::new().with_upload_delay(Duration::from_secs(5));
        let (mut session, mut rx, backend) = session(backend);
        backend.accept_upload("d1", "big.pdf");

        session.upload(pdf("big.pdf")).unwrap();

        let mut seen = vec![session.upload_progress()];
        loop {
            let event = rx.recv().await.unwrap();
            let finished = is_upload_result(&event);
            session.apply(event);
            if finished {
                break;
            }
            let progress = session.upload_progress();
            assert!(progress <= 90, "progress {} before response", progress);
            seen.push(progress);
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(90));
        assert_eq!(session.upload_progress(), 100);
        assert!(session.is_uploading());
        assert!(session.documents().is_empty());

        apply_until(&mut session, &mut rx, is_activation).await;
        assert_eq!(session.upload_progress(), 100);
        assert_eq!(session.documents().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_waits_for_delay() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        backend.accept_upload("d1", "report.pdf");
        session.upload(pdf("report.pdf")).unwrap();

        apply_until(&mut session, &mut rx, is_upload_result).await;
        let responded_at = tokio::time::Instant::now();
        assert!(session.active_document().is_none());

        apply_until(&mut session, &mut rx, is_activation).await;
        assert!(responded_at.elapsed() >= Duration::from_millis(500));
        assert!(session.active_document().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_adds_nothing() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        backend.push_upload(Err(ApiError::server(500, "Upload failed: corrupt xref table")));

        session.upload(pdf("broken.pdf")).unwrap();
        apply_until(&mut session, &mut rx, is_upload_result).await;

        assert!(session.documents().is_empty());
        assert!(session.active_document().is_none());
        assert!(!session.is_uploading());
        assert_eq!(session.upload_progress(), 0);
        assert_eq!(session.upload_phase(), UploadPhase::Idle);
        assert_eq!(session.upload_error(), Some("Upload failed: corrupt xref table"));
        assert_eq!(errors(&session), vec!["Upload failed: corrupt xref table".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_count_tracks_successful_uploads() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());

        with_document(&mut session, &mut rx, &backend, "d1", "a.pdf").await;

        backend.push_upload(Err(ApiError::network("Failed to connect to server")));
        session.upload(pdf("b.pdf")).unwrap();
        apply_until(&mut session, &mut rx, is_upload_result).await;

        with_document(&mut session, &mut rx, &backend, "d3", "c.pdf").await;

        let ids: Vec<_> = session.documents().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d3"]);
        assert_eq!(backend.uploads_made(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_pdf_never_reaches_backend() {
        let (mut session, _rx, backend) = session(ScriptedBackend::new());

        let result = session.upload(UploadFile::new("notes.txt", b"plain text".to_vec()));
        assert!(matches!(result, Err(UploadRejection::NotPdf { .. })));
        tokio::task::yield_now().await;

        assert_eq!(backend.uploads_made(), 0);
        assert!(!session.is_uploading());
        assert_eq!(session.notifications().len(), 1);
        assert_eq!(errors(&session).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_upload_rejected_while_in_flight() {
        let backend = ScriptedBackend::new().with_upload_delay(Duration::from_secs(2));
        let (mut session, mut rx, backend) = session(backend);
        backend.accept_upload("d1", "a.pdf");

        session.upload(pdf("a.pdf")).unwrap();
        assert_eq!(session.upload(pdf("b.pdf")), Err(UploadRejection::Busy));
        assert!(session.notifications().is_empty());

        apply_until(&mut session, &mut rx, is_activation).await;
        assert_eq!(backend.uploads_made(), 1);
        assert_eq!(session.documents().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_upload_rejected_during_activation_delay() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        backend.accept_upload("d1", "a.pdf");

        session.upload(pdf("a.pdf")).unwrap();
        apply_until(&mut session, &mut rx, is_upload_result).await;
        assert_eq!(session.upload_phase(), UploadPhase::Completing);
        assert!(session.is_uploading());

        assert_eq!(session.upload(pdf("b.pdf")), Err(UploadRejection::Busy));
        assert!(session.notifications().is_empty());

        apply_until(&mut session, &mut rx, is_activation).await;
        assert_eq!(backend.uploads_made(), 1);
        assert_eq!(session.documents().len(), 1);
        assert_eq!(session.active_document().unwrap().id, "d1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_path_reports_unreadable_file() {
        let (mut session, _rx, backend) = session(ScriptedBackend::new());
        let dir = tempfile::tempdir().unwrap();

        let result = session.upload_path(&dir.path().join("missing.pdf")).await;
        assert!(matches!(result, Err(UploadRejection::Unreadable { .. })));
        assert_eq!(errors(&session).len(), 1);
        assert_eq!(backend.uploads_made(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_path_reads_and_uploads() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF-1.5 content").unwrap();
        backend.accept_upload("p1", "paper.pdf");

        session.upload_path(&path).await.unwrap();
        apply_until(&mut session, &mut rx, is_activation).await;
        assert_eq!(session.active_document().map(|d| d.display_name.as_str()), Some("paper.pdf"));
    }

    // Query

    #[tokio::test(start_paused = true)]
    async fn test_query_summary_scenario() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        with_document(&mut session, &mut rx, &backend, "d1", "report.pdf").await;
        backend.push_answer(Ok(Answer {
            answer: "It is...".to_string(),
            citations: vec![Citation::page(3)],
        }));

        session.submit_query("What is the summary?").unwrap();
        assert!(session.is_querying());
        assert!(!session.can_query());
        assert_eq!(session.messages().len(), 1);
        assert!(session.is_provisional(&session.messages()[0]));

        apply_until(&mut session, &mut rx, is_answer).await;

        let log = session.messages();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, ChatRole::User);
        assert_eq!(log[0].content, "What is the summary?");
        assert_eq!(log[1].role, ChatRole::Assistant);
        assert_eq!(log[1].content, "It is...");
        assert_eq!(log[1].citations, vec![Citation::page(3)]);
        assert!(!session.is_querying());
        assert!(session.can_query());

        let sent = backend.queries.lock().unwrap().clone();
        assert_eq!(sent, vec![("d1".to_string(), "What is the summary?".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_network_failure_keeps_turns_balanced() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        with_document(&mut session, &mut rx, &backend, "d1", "report.pdf").await;
        backend.push_answer(Err(ApiError::network("Failed to connect to server")));

        session.submit_query("anything?").unwrap();
        apply_until(&mut session, &mut rx, is_answer).await;

        let log = session.messages();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, ChatRole::User);
        assert_eq!(log[1].role, ChatRole::Assistant);
        assert_eq!(log[1].content, FAILED_REPLY);
        assert!(log[1].is_error);
        assert_eq!(errors(&session), vec!["Failed to connect to server".to_string()]);
        assert!(!session.is_querying());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_without_document() {
        let (mut session, _rx, backend) = session(ScriptedBackend::new());

        assert_eq!(session.submit_query("hello"), Err(QueryRejection::NoDocument));
        tokio::task::yield_now().await;

        assert!(session.messages().is_empty());
        assert_eq!(errors(&session), vec![NO_DOCUMENT_MESSAGE.to_string()]);
        assert_eq!(session.notifications().len(), 1);
        assert!(!session.is_querying());
        assert_eq!(backend.queries_made(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_is_ignored() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        with_document(&mut session, &mut rx, &backend, "d1", "report.pdf").await;
        let before = session.notifications().len();

        assert_eq!(session.submit_query("   "), Err(QueryRejection::Empty));
        assert!(session.messages().is_empty());
        assert_eq!(session.notifications().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_submit_is_blocked() {
        let backend = ScriptedBackend::new().with_query_delay(Duration::from_secs(3));
        let (mut session, mut rx, backend) = session(backend);
        with_document(&mut session, &mut rx, &backend, "d1", "report.pdf").await;
        backend.push_answer(Ok(Answer {
            answer: "first".to_string(),
            citations: vec![],
        }));

        session.submit_query("one").unwrap();
        assert_eq!(session.submit_query("two"), Err(QueryRejection::Busy));
        assert_eq!(session.messages().len(), 1);

        apply_until(&mut session, &mut rx, is_answer).await;
        assert_eq!(session.messages().len(), 2);
        assert_eq!(backend.queries_made(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_blocks_query() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        with_document(&mut session, &mut rx, &backend, "d1", "report.pdf").await;
        session.set_connectivity(Connectivity::Offline);

        assert!(!session.can_query());
        assert_eq!(session.submit_query("hello"), Err(QueryRejection::Offline));
        assert!(session.messages().is_empty());
        assert!(!session.is_querying());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_document_discards_pending_reply() {
        let backend = ScriptedBackend::new().with_query_delay(Duration::from_secs(1));
        let (mut session, mut rx, backend) = session(backend);
        with_document(&mut session, &mut rx, &backend, "d1", "a.pdf").await;
        with_document(&mut session, &mut rx, &backend, "d2", "b.pdf").await;
        backend.push_answer(Ok(Answer {
            answer: "about b".to_string(),
            citations: vec![Citation::page(1)],
        }));

        session.submit_query("what is b?").unwrap();
        assert!(session.select_document(0));
        assert!(session.messages().is_empty());
        assert_eq!(session.active_document().map(|d| d.id.as_str()), Some("d1"));

        apply_until(&mut session, &mut rx, is_answer).await;
        assert!(session.messages().is_empty());
        assert!(!session.is_querying());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselecting_active_document_starts_fresh() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        with_document(&mut session, &mut rx, &backend, "d1", "a.pdf").await;
        backend.push_answer(Ok(Answer {
            answer: "yes".to_string(),
            citations: vec![],
        }));
        session.submit_query("q").unwrap();
        apply_until(&mut session, &mut rx, is_answer).await;
        assert_eq!(session.messages().len(), 2);

        assert!(session.select_document(0));
        assert!(session.messages().is_empty());
    }

    // Connectivity

    #[tokio::test(start_paused = true)]
    async fn test_health_check_online() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut session, mut rx) = Session::new(backend.clone(), Timings::default());
        assert_eq!(session.connectivity(), Connectivity::Checking);

        session.check_health();
        apply_until(&mut session, &mut rx, |e| matches!(e, SessionEvent::HealthChecked { .. })).await;

        assert_eq!(session.connectivity(), Connectivity::Online);
        assert_eq!(
            session.latest_notification().map(|n| n.text.as_str()),
            Some(HEALTH_OK_MESSAGE)
        );

        apply_until(&mut session, &mut rx, |e| matches!(e, SessionEvent::DocumentsListed(_))).await;
        assert_eq!(session.remote_document_count(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_offline_then_retry() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_health(Err(ApiError::network("Failed to connect to backend")));
        let (mut session, mut rx) = Session::new(backend.clone(), Timings::default());

        session.check_health();
        apply_until(&mut session, &mut rx, |e| matches!(e, SessionEvent::HealthChecked { .. })).await;
        assert_eq!(session.connectivity(), Connectivity::Offline);
        assert_eq!(errors(&session), vec![HEALTH_FAILED_MESSAGE.to_string()]);

        session.retry_connection();
        assert_eq!(session.connectivity(), Connectivity::Checking);
        apply_until(&mut session, &mut rx, |e| matches!(e, SessionEvent::HealthChecked { .. })).await;
        assert_eq!(session.connectivity(), Connectivity::Online);
        assert_eq!(backend.health_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_health_result_is_ignored() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut session, mut rx) = Session::new(backend.clone(), Timings::default());

        session.check_health();
        session.apply(SessionEvent::HealthChecked {
            check: 0,
            result: Err(ApiError::network("down")),
        });
        assert_eq!(session.connectivity(), Connectivity::Checking);
        assert!(session.notifications().is_empty());

        apply_until(&mut session, &mut rx, |e| matches!(e, SessionEvent::HealthChecked { .. })).await;
        assert_eq!(session.connectivity(), Connectivity::Online);
        assert!(errors(&session).is_empty());
    }

    // Notifications

    #[tokio::test(start_paused = true)]
    async fn test_notification_expires_through_session() {
        let (mut session, mut rx, _backend) = session(ScriptedBackend::new());
        let start = tokio::time::Instant::now();
        let id = session.notify_info("hello");

        apply_until(&mut session, &mut rx, |e| matches!(e, SessionEvent::NotificationExpired(x) if *x == id)).await;
        assert!(session.notifications().is_empty());
        assert!(start.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismissed_notification_never_expires_again() {
        let (mut session, mut rx, _backend) = session(ScriptedBackend::new());
        let dismissed = session.notify_error("first");
        let kept = session.notify_info("second");

        assert!(session.dismiss_notification(dismissed));
        assert!(!session.dismiss_notification(dismissed));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::NotificationExpired(id) if id == kept));
        session.apply(event);
        assert!(session.notifications().is_empty());

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_url_for_active_document() {
        let (mut session, mut rx, backend) = session(ScriptedBackend::new());
        assert_eq!(session.preview_url(), None);

        with_document(&mut session, &mut rx, &backend, "d1", "report.pdf").await;
        assert_eq!(
            session.preview_url().as_deref(),
            Some("http://backend.test/uploads/d1_report.pdf")
        );
    }
}
