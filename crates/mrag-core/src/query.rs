use thiserror::Error;

use crate::api::Answer;
use crate::conversation::{ConversationLog, TurnTicket};
use crate::documents::DocumentSession;
use crate::error::ApiError;
use crate::event::SessionEvent;
use crate::notifications::NotificationQueue;
use crate::session::SessionContext;
use crate::state::Connectivity;

pub const NO_DOCUMENT_MESSAGE: &str = "Please upload a PDF document first";
pub const FAILED_REPLY: &str = "Error processing your question.";

/// Why a question was not sent
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRejection {
    #[error("Question is empty")]
    Empty,
    #[error("A question is already being answered")]
    Busy,
    #[error("{}", NO_DOCUMENT_MESSAGE)]
    NoDocument,
    #[error("Backend is offline")]
    Offline,
}

#[derive(Debug, Default)]
pub struct QueryController {
    in_flight: Option<TurnTicket>,
}

impl QueryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_querying(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Send `text` about the active document.
    ///
    /// On success the user message is already in the log and exactly one
    /// reply will follow when the `QueryFinished` event is applied.
    pub fn submit(
        &mut self,
        ctx: &SessionContext,
        documents: &DocumentSession,
        log: &mut ConversationLog,
        notifications: &mut NotificationQueue,
        text: &str,
    ) -> Result<TurnTicket, QueryRejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryRejection::Empty);
        }
        if self.is_querying() {
            return Err(QueryRejection::Busy);
        }
        let Some(document) = documents.active() else {
            notifications.error(NO_DOCUMENT_MESSAGE);
            return Err(QueryRejection::NoDocument);
        };
        if ctx.connectivity == Connectivity::Offline {
            return Err(QueryRejection::Offline);
        }

        let turn = log.begin_turn(text);
        self.in_flight = Some(turn);
        tracing::info!(doc_id = %document.id, "question submitted");

        let tx = ctx.events.clone();
        let backend = ctx.backend.clone();
        let doc_id = document.id.clone();
        let query = text.to_string();
        tokio::spawn(async move {
            let result = backend.query(&doc_id, &query).await;
            let _ = tx.send(SessionEvent::QueryFinished { turn, result });
        });

        Ok(turn)
    }

    pub fn on_finished(
        &mut self,
        log: &mut ConversationLog,
        notifications: &mut NotificationQueue,
        turn: TurnTicket,
        result: Result<Answer, ApiError>,
    ) {
        if self.in_flight == Some(turn) {
            self.in_flight = None;
        }

        match result {
            Ok(answer) => {
                tracing::debug!(citations = answer.citations.len(), "answer received");
                log.confirm(turn, answer.answer, answer.citations);
            }
            Err(err) => {
                tracing::warn!(error = %err, "question failed");
                notifications.error(err.to_string());
                log.fail(turn, FAILED_REPLY);
            }
        }
    }
}
