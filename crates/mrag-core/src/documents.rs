use crate::conversation::ConversationLog;
use crate::state::Document;

/// Documents uploaded during this session, plus the one chat targets.
///
/// There is no removal; the list lives as long as the session.
#[derive(Debug, Default)]
pub struct DocumentSession {
    documents: Vec<Document>,
    active: Option<Document>,
}

impl DocumentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `document` the chat target. Always clears the conversation, even
    /// when it is already active.
    pub fn activate(&mut self, document: Document, log: &mut ConversationLog) {
        tracing::debug!(doc_id = %document.id, "activating document");
        self.active = Some(document);
        log.clear();
    }

    pub fn register_upload(&mut self, document: Document, log: &mut ConversationLog) {
        self.documents.push(document.clone());
        self.activate(document, log);
    }

    /// Re-activate a previously uploaded document by position
    pub fn select(&mut self, index: usize, log: &mut ConversationLog) -> bool {
        match self.documents.get(index).cloned() {
            Some(document) => {
                self.activate(document, log);
                true
            }
            None => false,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn active(&self) -> Option<&Document> {
        self.active.as_ref()
    }

    pub fn active_index(&self) -> Option<usize> {
        let active = self.active.as_ref()?;
        self.documents.iter().position(|d| d.id == active.id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
