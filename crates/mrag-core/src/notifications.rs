use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::event::{EventSender, SessionEvent};
use crate::state::{Notification, NotificationId, NotificationKind};

/// Transient user-facing messages, each removed after a fixed lifetime.
///
/// Every pushed notification owns an expiry task keyed by its id. Dismissing
/// early aborts that task, so an expiry event for a dismissed notification
/// is never delivered.
pub struct NotificationQueue {
    items: Vec<Notification>,
    timers: HashMap<NotificationId, JoinHandle<()>>,
    lifetime: Duration,
    events: EventSender,
}

impl NotificationQueue {
    pub fn new(lifetime: Duration, events: EventSender) -> Self {
        Self {
            items: Vec::new(),
            timers: HashMap::new(),
            lifetime,
            events,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn push(&mut self, kind: NotificationKind, text: impl Into<String>) -> NotificationId {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            created_at: Utc::now(),
        };
        let id = notification.id;
        tracing::debug!(%id, ?kind, text = %notification.text, "notification pushed");
        self.items.push(notification);

        let tx = self.events.clone();
        let lifetime = self.lifetime;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            let _ = tx.send(SessionEvent::NotificationExpired(id));
        });
        self.timers.insert(id, timer);

        id
    }

    pub fn success(&mut self, text: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Success, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Error, text)
    }

    pub fn info(&mut self, text: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Info, text)
    }

    pub fn warning(&mut self, text: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Warning, text)
    }

    /// Remove early. Unknown ids are a no-op.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
        self.remove(id)
    }

    /// Handle a fired expiry timer
    pub(crate) fn expire(&mut self, id: NotificationId) -> bool {
        self.timers.remove(&id);
        self.remove(id)
    }

    fn remove(&mut self, id: NotificationId) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        before != self.items.len()
    }

    /// Live notifications, oldest first
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}
