//! Transient notifications
//!
//! Short-lived alerts shown next to the conversation. They never touch the
//! transcript and expire on their own after a fixed display time.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

/// Default display time for a notification
pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationId(String);

impl NotificationId {
    fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct Notification {
    id: NotificationId,
    message: String,
    kind: NotificationKind,
    created_at: Instant,
}

impl Notification {
    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

/// Live notifications in the order they were raised
#[derive(Debug)]
pub struct Notifications {
    items: Vec<Notification>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifications {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            items: Vec::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) -> NotificationId {
        self.notify_at(message, kind, Instant::now())
    }

    pub fn notify_at(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: Instant,
    ) -> NotificationId {
        let id = NotificationId::fresh();
        let message = message.into();
        debug!(%id, ?kind, %message, "notification raised");

        self.items.push(Notification {
            id: id.clone(),
            message,
            kind,
            created_at: now,
        });
        id
    }

    /// Remove one notification now. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: &NotificationId) -> bool {
        let before = self.items.len();
        self.items.retain(|n| &n.id != id);
        before != self.items.len()
    }

    /// Drop every notification that has been visible for at least the TTL
    pub fn expire(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.items.len();
        self.items
            .retain(|n| now.saturating_duration_since(n.created_at) < ttl);
        before - self.items.len()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Notification> {
        self.items.iter()
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
}
