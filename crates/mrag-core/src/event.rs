//! Completions delivered back to the session loop.
//!
//! Network calls and timers run as tokio tasks that never touch session
//! state. When they finish they send one of these, and the owner of the
//! [`Session`](crate::Session) applies it with `Session::apply`.

use tokio::sync::mpsc;

use crate::api::{Answer, HealthStatus, RemoteDocument, UploadReceipt};
use crate::conversation::TurnTicket;
use crate::error::ApiError;
use crate::state::{Document, NotificationId};

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

#[derive(Debug)]
pub enum SessionEvent {
    HealthChecked {
        check: u64,
        result: Result<HealthStatus, ApiError>,
    },
    DocumentsListed(Result<Vec<RemoteDocument>, ApiError>),
    UploadProgress {
        attempt: u64,
    },
    UploadFinished {
        attempt: u64,
        file_name: String,
        result: Result<UploadReceipt, ApiError>,
    },
    UploadActivate {
        attempt: u64,
        document: Document,
    },
    QueryFinished {
        turn: TurnTicket,
        result: Result<Answer, ApiError>,
    },
    NotificationExpired(NotificationId),
}
