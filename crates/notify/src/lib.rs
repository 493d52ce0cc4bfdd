//! Notification dispatch boundary.
//!
//! Delivery (push, email, in-app feeds) is an external collaborator: the core
//! fires events at a [`NotificationDispatch`] and moves on. The trait methods
//! return nothing on purpose: a failed delivery must never roll back the
//! state transition that triggered it, so implementations swallow and log
//! their own failures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

pub type UserId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Match,
    Claim,
    System,
}

/// One user-facing notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Fire-and-forget notification sink.
pub trait NotificationDispatch: Send + Sync {
    fn notify(&self, user: UserId, note: Notification);

    /// Deliver to every admin. The dispatcher owns the admin roster; the core
    /// does not know who the admins are.
    fn notify_admins(&self, note: Notification);
}

/// Log-only dispatcher for deployments where delivery is wired up elsewhere.
pub struct TracingDispatch;

impl NotificationDispatch for TracingDispatch {
    fn notify(&self, user: UserId, note: Notification) {
        tracing::info!(
            user,
            kind = ?note.kind,
            title = %note.title,
            link = note.link.as_deref().unwrap_or(""),
            "notification dispatched"
        );
    }

    fn notify_admins(&self, note: Notification) {
        tracing::info!(
            kind = ?note.kind,
            title = %note.title,
            "notification dispatched to admins"
        );
    }
}

/// In-memory dispatcher that retains everything it delivers.
///
/// Backs the tests and the server's notification listing endpoint.
pub struct MemoryDispatch {
    admins: Vec<UserId>,
    inboxes: Mutex<HashMap<UserId, Vec<Notification>>>,
}

impl MemoryDispatch {
    pub fn new() -> Self {
        Self::with_admins(Vec::new())
    }

    pub fn with_admins(admins: Vec<UserId>) -> Self {
        Self {
            admins,
            inboxes: Mutex::new(HashMap::new()),
        }
    }

    /// Everything delivered to the given user so far, in delivery order.
    pub fn inbox(&self, user: UserId) -> Vec<Notification> {
        match self.inboxes.lock() {
            Ok(guard) => guard.get(&user).cloned().unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    pub fn admins(&self) -> &[UserId] {
        &self.admins
    }

    fn push(&self, user: UserId, note: Notification) {
        // A poisoned inbox only loses the copy, never the caller.
        if let Ok(mut guard) = self.inboxes.lock() {
            guard.entry(user).or_default().push(note);
        } else {
            tracing::warn!(user, "notification inbox poisoned, delivery dropped");
        }
    }
}

impl Default for MemoryDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDispatch for MemoryDispatch {
    fn notify(&self, user: UserId, note: Notification) {
        self.push(user, note);
    }

    fn notify_admins(&self, note: Notification) {
        for admin in &self.admins {
            self.push(*admin, note.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str) -> Notification {
        Notification::new(NotificationKind::Match, title, "message")
    }

    #[test]
    fn memory_dispatch_retains_per_user() {
        let dispatch = MemoryDispatch::new();
        dispatch.notify(1, note("first"));
        dispatch.notify(1, note("second"));
        dispatch.notify(2, note("other"));

        let inbox = dispatch.inbox(1);
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].title, "first");
        assert_eq!(dispatch.inbox(2).len(), 1);
        assert!(dispatch.inbox(3).is_empty());
    }

    #[test]
    fn notify_admins_reaches_every_admin() {
        let dispatch = MemoryDispatch::with_admins(vec![10, 11]);
        dispatch.notify_admins(note("claim awaiting review"));

        assert_eq!(dispatch.inbox(10).len(), 1);
        assert_eq!(dispatch.inbox(11).len(), 1);
        assert!(dispatch.inbox(12).is_empty());
    }

    #[test]
    fn notification_link_builder() {
        let n = note("match").with_link("/matches/7");
        assert_eq!(n.link.as_deref(), Some("/matches/7"));
    }
}
