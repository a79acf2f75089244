//! UI-agnostic session state types
//!
//! These are the entities the session state machine hands out to whatever is
//! rendering it. None of them depend on a UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded PDF, as known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Server-assigned identifier. Opaque.
    pub id: String,
    pub display_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            uploaded_at: Utc::now(),
        }
    }
}

/// A source-page reference attached to an assistant answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Citation {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            excerpt: None,
            score: None,
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A chat message in the conversation about the active document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Set on the placeholder reply appended when a query fails.
    #[serde(default)]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content.into(), Vec::new(), false)
    }

    pub fn assistant(content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self::new(ChatRole::Assistant, content.into(), citations, false)
    }

    pub fn assistant_error(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content.into(), Vec::new(), true)
    }

    fn new(role: ChatRole, content: String, citations: Vec<Citation>, is_error: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
            citations,
            is_error,
        }
    }

    /// Distinct cited pages, in first-seen order
    pub fn cited_pages(&self) -> Vec<u32> {
        let mut pages = Vec::new();
        for citation in &self.citations {
            if !pages.contains(&citation.page) {
                pages.push(citation.page);
            }
        }
        pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

pub type NotificationId = Uuid;

/// A transient message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Backend reachability as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    #[default]
    Checking,
    Online,
    Offline,
}

impl Connectivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connectivity::Checking => "checking",
            Connectivity::Online => "online",
            Connectivity::Offline => "offline",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cited_pages_are_distinct_and_ordered() {
        let msg = ChatMessage::assistant(
            "answer",
            vec![Citation::page(3), Citation::page(1), Citation::page(3)],
        );
        assert_eq!(msg.cited_pages(), vec![3, 1]);
    }

    #[test]
    fn test_error_reply_is_flagged() {
        let msg = ChatMessage::assistant_error("Error processing your question.");
        assert_eq!(msg.role, ChatRole::Assistant);
        assert!(msg.is_error);
        assert!(msg.citations.is_empty());
    }
}
