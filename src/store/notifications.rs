//! Notification feed and unread counter.

use crate::models::{Notification, NotificationFilter};

/// Read state of one notification before a local toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSnapshot {
    pub id: i64,
    /// `None` when the notification is not in the loaded list.
    pub was_read: Option<bool>,
    pub unread_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationsSlice {
    pub unread_count: u64,
    /// Newest first.
    pub items: Vec<Notification>,
    pub filter: NotificationFilter,
}

impl NotificationsSlice {
    /// Authoritative count from the server.
    pub fn set_unread(&mut self, count: u64) {
        self.unread_count = count;
    }

    pub fn increment_unread(&mut self) {
        self.unread_count += 1;
    }

    /// Prepend a pushed notification unless it is already listed.
    pub fn add(&mut self, notification: Notification) {
        if self.items.iter().any(|n| n.id == notification.id) {
            return;
        }
        self.items.insert(0, notification);
    }

    pub fn set_items(&mut self, filter: NotificationFilter, items: Vec<Notification>) {
        self.filter = filter;
        self.items = items;
    }

    /// Mark one notification read. The snapshot restores the exact prior state.
    pub fn mark_read(&mut self, id: i64) -> ReadSnapshot {
        let snapshot = self.snapshot(id);
        if let Some(n) = self.items.iter_mut().find(|n| n.id == id && !n.is_read) {
            n.is_read = true;
            self.unread_count = self.unread_count.saturating_sub(1);
        }
        snapshot
    }

    pub fn mark_unread(&mut self, id: i64) -> ReadSnapshot {
        let snapshot = self.snapshot(id);
        if let Some(n) = self.items.iter_mut().find(|n| n.id == id && n.is_read) {
            n.is_read = false;
            self.unread_count += 1;
        }
        snapshot
    }

    /// Undo [`Self::mark_read`] or [`Self::mark_unread`].
    pub fn restore_read(&mut self, snapshot: ReadSnapshot) {
        if let Some(was_read) = snapshot.was_read {
            if let Some(n) = self.items.iter_mut().find(|n| n.id == snapshot.id) {
                n.is_read = was_read;
            }
        }
        self.unread_count = snapshot.unread_count;
    }

    fn snapshot(&self, id: i64) -> ReadSnapshot {
        ReadSnapshot {
            id,
            was_read: self.items.iter().find(|n| n.id == id).map(|n| n.is_read),
            unread_count: self.unread_count,
        }
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.items {
            n.is_read = true;
        }
        self.unread_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationCategory;
    use chrono::Utc;

    fn notification(id: i64, is_read: bool) -> Notification {
        Notification {
            id,
            category: NotificationCategory::Like,
            actor: None,
            text: None,
            is_read,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn set_unread_overrides_local_increments() {
        let mut slice = NotificationsSlice::default();
        slice.increment_unread();
        slice.increment_unread();
        slice.set_unread(1);
        assert_eq!(slice.unread_count, 1);
    }

    #[test]
    fn mark_read_floors_at_zero_and_is_idempotent() {
        let mut slice = NotificationsSlice::default();
        slice.set_items(NotificationFilter::All, vec![notification(1, false)]);
        assert_eq!(slice.mark_read(1).was_read, Some(false));
        assert_eq!(slice.mark_read(1).was_read, Some(true));
        assert_eq!(slice.unread_count, 0);
    }

    #[test]
    fn restore_after_floored_mark_read_is_exact() {
        let mut slice = NotificationsSlice::default();
        slice.set_items(NotificationFilter::All, vec![notification(1, false)]);
        let before = slice.clone();

        let snapshot = slice.mark_read(1);
        assert_eq!(slice.unread_count, 0);
        slice.restore_read(snapshot);
        assert_eq!(slice, before);
    }

    #[test]
    fn unloaded_id_only_restores_the_counter() {
        let mut slice = NotificationsSlice::default();
        slice.set_unread(3);
        let snapshot = slice.mark_unread(42);
        assert_eq!(snapshot.was_read, None);
        assert_eq!(slice.unread_count, 3);
        slice.set_unread(5);
        slice.restore_read(snapshot);
        assert_eq!(slice.unread_count, 3);
        assert!(slice.items.is_empty());
    }

    #[test]
    fn add_skips_duplicates() {
        let mut slice = NotificationsSlice::default();
        slice.add(notification(5, false));
        slice.add(notification(5, false));
        slice.add(notification(6, false));
        let ids: Vec<i64> = slice.items.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![6, 5]);
    }

    #[test]
    fn mark_all_read_clears_counter() {
        let mut slice = NotificationsSlice::default();
        slice.set_items(
            NotificationFilter::Mentions,
            vec![notification(1, false), notification(2, false)],
        );
        slice.set_unread(2);
        slice.mark_all_read();
        assert_eq!(slice.unread_count, 0);
        assert!(slice.items.iter().all(|n| n.is_read));
        assert_eq!(slice.filter, NotificationFilter::Mentions);
    }
}
