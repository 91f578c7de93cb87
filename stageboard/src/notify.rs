//! User-facing notifications (toasts)
//!
//! Each transition produces at most one `Loading` toast, dismissed on settlement, followed by
//! a `Success` or `Error` toast.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Default capacity of the notification broadcast channel
pub const DEFAULT_CAPACITY: usize = 64;

/// Handle used to dismiss a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(u64);

impl NotificationId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
}

/// Events published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    Shown(Notification),
    Dismissed { id: NotificationId },
}

/// Sink for transition notifications
pub trait Notifier: Send + Sync {
    /// Show a notification and return its handle
    fn show(&self, kind: NotificationKind, message: String) -> NotificationId;

    /// Dismiss a previously shown notification. Unknown ids are ignored.
    fn dismiss(&self, id: NotificationId);

    fn loading(&self, message: String) -> NotificationId {
        self.show(NotificationKind::Loading, message)
    }

    fn success(&self, message: String) -> NotificationId {
        self.show(NotificationKind::Success, message)
    }

    fn error(&self, message: String) -> NotificationId {
        self.show(NotificationKind::Error, message)
    }
}

/// Broadcasting notifier that also tracks which toasts are currently visible
pub struct NotificationCenter {
    next_id: AtomicU64,
    visible: Mutex<Vec<Notification>>,
    sender: broadcast::Sender<NotificationEvent>,
}

impl NotificationCenter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            next_id: AtomicU64::new(1),
            visible: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Subscribe to notification events.
    ///
    /// Subscribers only see events published after they subscribed. A subscriber that
    /// falls more than `capacity` events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    /// Notifications shown and not yet dismissed, oldest first
    pub fn visible(&self) -> Vec<Notification> {
        self.visible
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn publish(&self, event: NotificationEvent) {
        // No subscribers is fine; the visible list is still maintained.
        let _ = self.sender.send(event);
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier for NotificationCenter {
    fn show(&self, kind: NotificationKind, message: String) -> NotificationId {
        let id = NotificationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let notification = Notification { id, kind, message };

        self.visible
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification.clone());
        self.publish(NotificationEvent::Shown(notification));
        id
    }

    fn dismiss(&self, id: NotificationId) {
        let removed = {
            let mut visible = self
                .visible
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let before = visible.len();
            visible.retain(|n| n.id != id);
            visible.len() != before
        };

        if removed {
            self.publish(NotificationEvent::Dismissed { id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_then_dismiss() {
        let center = NotificationCenter::default();
        let id = center.loading("Moving Acme to Active...".into());
        assert_eq!(center.visible().len(), 1);
        assert_eq!(center.visible()[0].kind, NotificationKind::Loading);

        center.dismiss(id);
        assert!(center.visible().is_empty());
    }

    #[test]
    fn test_dismiss_unknown_is_ignored() {
        let center = NotificationCenter::default();
        let mut rx = center.subscribe();
        center.dismiss(NotificationId(42));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let center = NotificationCenter::new(8);
        let mut rx = center.subscribe();

        let loading = center.loading("Moving Acme to Active...".into());
        center.dismiss(loading);
        center.success("Moved Acme to Active stage".into());

        match rx.recv().await.unwrap() {
            NotificationEvent::Shown(n) => assert_eq!(n.kind, NotificationKind::Loading),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(
            rx.recv().await.unwrap(),
            NotificationEvent::Dismissed { id: loading }
        );
        match rx.recv().await.unwrap() {
            NotificationEvent::Shown(n) => {
                assert_eq!(n.kind, NotificationKind::Success);
                assert_eq!(n.message, "Moved Acme to Active stage");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let center = NotificationCenter::default();
        let a = center.error("a".into());
        let b = center.error("b".into());
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }
}
