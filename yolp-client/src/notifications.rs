//! Notification feed for user-facing outcomes.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Oldest notifications are dropped past this many.
const MAX_NOTIFICATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Shared queue of notifications waiting to be shown.
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    queue: Arc<Mutex<VecDeque<Notification>>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let mut queue = self.lock();
        if queue.len() == MAX_NOTIFICATIONS {
            queue.pop_front();
        }
        queue.push_back(Notification::new(level, message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    /// Take every queued notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_in_order_and_empties() {
        let notifications = Notifications::new();
        notifications.success("Restaurant added");
        notifications.error("Error adding restaurant");

        let drained = notifications.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, NotificationLevel::Success);
        assert_eq!(drained[1].message, "Error adding restaurant");
        assert!(notifications.is_empty());
    }

    #[test]
    fn test_queue_is_bounded() {
        let notifications = Notifications::new();
        for i in 0..MAX_NOTIFICATIONS + 5 {
            notifications.notify(NotificationLevel::Info, format!("n{i}"));
        }
        let drained = notifications.drain();
        assert_eq!(drained.len(), MAX_NOTIFICATIONS);
        assert_eq!(drained[0].message, "n5");
    }
}
