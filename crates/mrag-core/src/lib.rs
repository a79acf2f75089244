pub mod api;
pub mod config;
pub mod conversation;
pub mod documents;
pub mod error;
pub mod event;
pub mod notifications;
pub mod query;
pub mod session;
pub mod state;
pub mod upload;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use api::{Answer, HealthStatus, RagBackend, RagClient, RemoteDocument, UploadFile, UploadReceipt};
pub use config::{Config, Timeouts, Timings};
pub use conversation::{ConversationLog, TurnTicket};
pub use documents::DocumentSession;
pub use error::ApiError;
pub use event::{EventReceiver, EventSender, SessionEvent};
pub use notifications::NotificationQueue;
pub use query::{QueryController, QueryRejection};
pub use session::{Session, SessionContext};
pub use state::{ChatMessage, ChatRole, Citation, Connectivity, Document, Notification, NotificationId, NotificationKind};
pub use upload::{UploadController, UploadPhase, UploadRejection};
