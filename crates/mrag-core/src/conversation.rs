use uuid::Uuid;

use crate::state::{ChatMessage, Citation};

/// Identifies one question/answer round-trip in a particular log generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTicket {
    epoch: u64,
    user_message: Uuid,
}

impl TurnTicket {
    pub fn user_message_id(&self) -> Uuid {
        self.user_message
    }
}

/// Messages about the active document.
///
/// A turn is appended in two phases: [`begin_turn`](Self::begin_turn) inserts
/// the user message provisionally, then exactly one of
/// [`confirm`](Self::confirm) or [`fail`](Self::fail) appends the reply.
/// Clearing starts a new generation; replies for tickets issued before the
/// clear are rejected.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
    pending: Option<TurnTicket>,
    epoch: u64,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_turn(&mut self, content: impl Into<String>) -> TurnTicket {
        let message = ChatMessage::user(content);
        let ticket = TurnTicket {
            epoch: self.epoch,
            user_message: message.id,
        };
        self.messages.push(message);
        self.pending = Some(ticket);
        ticket
    }

    /// Append the answer. Returns false if the ticket is stale.
    pub fn confirm(&mut self, ticket: TurnTicket, answer: impl Into<String>, citations: Vec<Citation>) -> bool {
        self.settle(ticket, ChatMessage::assistant(answer, citations))
    }

    /// Append the fallback reply for a failed turn. Returns false if the
    /// ticket is stale.
    pub fn fail(&mut self, ticket: TurnTicket, reply: impl Into<String>) -> bool {
        self.settle(ticket, ChatMessage::assistant_error(reply))
    }

    fn settle(&mut self, ticket: TurnTicket, reply: ChatMessage) -> bool {
        if ticket.epoch != self.epoch || self.pending != Some(ticket) {
            tracing::debug!(?ticket, "dropping reply for a cleared conversation");
            return false;
        }
        self.messages.push(reply);
        self.pending = None;
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = None;
        self.epoch += 1;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The turn still waiting on a reply, if any
    pub fn pending(&self) -> Option<TurnTicket> {
        self.pending
    }

    pub fn is_provisional(&self, message_id: Uuid) -> bool {
        self.pending.map(|t| t.user_message) == Some(message_id)
    }

    pub fn last_reply(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::state::ChatRole::Assistant)
    }
}
