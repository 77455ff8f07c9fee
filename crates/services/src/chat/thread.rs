//! Ordered, id-keyed message collection with optimistic sends.
//!
//! The thread owns the client-visible message list for one channel or DM
//! conversation: pages fetched newest-first merge in at the front, realtime
//! change events apply with last-write-wins semantics, and an in-flight send
//! appears immediately under a temporary id until the persisted row confirms
//! it or a failure rolls it back.

use chrono::{DateTime, Utc};
use db::{channel_messages::ChannelMessage, dm::DmMessage};
use uuid::Uuid;

use crate::events::RowChange;

pub trait ThreadMessage: Clone {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
}

impl ThreadMessage for ChannelMessage {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl ThreadMessage for DmMessage {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Send lifecycle of one entry. A rolled-back send never reaches the list;
/// it is removed outright, so only two states are ever visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone)]
pub struct ThreadEntry<M> {
    pub message: M,
    pub delivery: Delivery,
}

#[derive(Debug, Default)]
pub struct MessageThread<M> {
    // Ascending (created_at, id); ids unique.
    entries: Vec<ThreadEntry<M>>,
}

impl<M: ThreadMessage> MessageThread<M> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &M> {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.iter().any(|e| e.message.id() == id)
    }

    /// Cursor for the next older page: creation time of the oldest message
    /// currently held.
    pub fn oldest_cursor(&self) -> Option<DateTime<Utc>> {
        self.entries.first().map(|e| e.message.created_at())
    }

    fn sort_key(message: &M) -> (DateTime<Utc>, Uuid) {
        (message.created_at(), message.id())
    }

    fn insert_sorted(&mut self, entry: ThreadEntry<M>) {
        let key = Self::sort_key(&entry.message);
        let at = self
            .entries
            .partition_point(|e| Self::sort_key(&e.message) < key);
        self.entries.insert(at, entry);
    }

    /// Merges a page fetched in descending created_at order (the fetch
    /// shape) into ascending thread order. Rows already present are skipped,
    /// so re-fetching a page is harmless.
    pub fn merge_older_page(&mut self, page_desc: Vec<M>) {
        for message in page_desc.into_iter().rev() {
            if !self.contains(message.id()) {
                self.insert_sorted(ThreadEntry {
                    message,
                    delivery: Delivery::Confirmed,
                });
            }
        }
    }

    /// Shows an optimistic send immediately. `draft` carries a temporary
    /// client-side id that [`confirm`](Self::confirm) or
    /// [`roll_back`](Self::roll_back) resolves.
    pub fn begin_send(&mut self, draft: M) {
        self.insert_sorted(ThreadEntry {
            message: draft,
            delivery: Delivery::Pending,
        });
    }

    /// Replaces the pending entry with the persisted row. The realtime
    /// insert for the same row may have already arrived; in that case the
    /// temporary entry is just dropped.
    pub fn confirm(&mut self, temp_id: Uuid, persisted: M) {
        self.entries.retain(|e| e.message.id() != temp_id);
        if !self.contains(persisted.id()) {
            self.insert_sorted(ThreadEntry {
                message: persisted,
                delivery: Delivery::Confirmed,
            });
        }
    }

    /// Failed send: the temporary message disappears without residue.
    pub fn roll_back(&mut self, temp_id: Uuid) {
        self.entries.retain(|e| e.message.id() != temp_id);
    }

    /// Applies one realtime change with last-write-wins semantics. A
    /// duplicate insert is ignored; an update for an unknown row inserts it
    /// (the row may predate the loaded window); a delete for an unknown row
    /// is a no-op.
    pub fn apply(&mut self, change: RowChange<M>) {
        match change {
            RowChange::Insert { row } => {
                if !self.contains(row.id()) {
                    self.insert_sorted(ThreadEntry {
                        message: row,
                        delivery: Delivery::Confirmed,
                    });
                }
            }
            RowChange::Update { row } => {
                if let Some(entry) = self.entries.iter_mut().find(|e| e.message.id() == row.id()) {
                    entry.message = row;
                    entry.delivery = Delivery::Confirmed;
                } else {
                    self.insert_sorted(ThreadEntry {
                        message: row,
                        delivery: Delivery::Confirmed,
                    });
                }
            }
            RowChange::Delete { id } => {
                self.entries.retain(|e| e.message.id() != id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn message(seconds: i64, content: &str) -> ChannelMessage {
        let base = Utc::now() - Duration::hours(1);
        ChannelMessage {
            id: Uuid::new_v4(),
            channel_id: Uuid::nil(),
            sender_id: Uuid::new_v4(),
            content: content.to_string(),
            reply_to_id: None,
            edited_at: None,
            created_at: base + Duration::seconds(seconds),
        }
    }

    fn contents(thread: &MessageThread<ChannelMessage>) -> Vec<String> {
        thread.messages().map(|m| m.content.clone()).collect()
    }

    #[test]
    fn descending_page_merges_into_ascending_order() {
        let mut thread = MessageThread::new();
        thread.merge_older_page(vec![message(30, "c"), message(20, "b"), message(10, "a")]);
        assert_eq!(contents(&thread), ["a", "b", "c"]);
    }

    #[test]
    fn older_page_lands_before_existing_window() {
        let mut thread = MessageThread::new();
        thread.merge_older_page(vec![message(40, "d"), message(30, "c")]);
        let cursor = thread.oldest_cursor().unwrap();
        thread.merge_older_page(vec![message(20, "b"), message(10, "a")]);
        assert_eq!(contents(&thread), ["a", "b", "c", "d"]);
        assert!(thread.oldest_cursor().unwrap() < cursor);
    }

    #[test]
    fn failed_send_leaves_no_trace() {
        let mut thread = MessageThread::new();
        thread.merge_older_page(vec![message(10, "a")]);

        let draft = message(20, "never sent");
        let temp_id = draft.id;
        thread.begin_send(draft);
        assert_eq!(thread.len(), 2);

        thread.roll_back(temp_id);
        assert_eq!(contents(&thread), ["a"]);
        assert!(!thread.contains(temp_id));
    }

    #[test]
    fn confirm_swaps_temporary_for_persisted_row() {
        let mut thread = MessageThread::new();
        let draft = message(20, "hi");
        let temp_id = draft.id;
        thread.begin_send(draft);

        let persisted = message(21, "hi");
        thread.confirm(temp_id, persisted.clone());

        assert!(!thread.contains(temp_id));
        assert!(thread.contains(persisted.id));
        assert_eq!(thread.len(), 1);
    }

    #[test]
    fn confirm_after_realtime_insert_does_not_duplicate() {
        let mut thread = MessageThread::new();
        let draft = message(20, "hi");
        let temp_id = draft.id;
        thread.begin_send(draft);

        let persisted = message(21, "hi");
        thread.apply(RowChange::Insert {
            row: persisted.clone(),
        });
        thread.confirm(temp_id, persisted.clone());

        assert_eq!(thread.len(), 1);
        assert!(thread.contains(persisted.id));
    }

    #[test]
    fn duplicate_insert_events_are_idempotent() {
        let mut thread = MessageThread::new();
        let row = message(10, "a");
        thread.apply(RowChange::Insert { row: row.clone() });
        thread.apply(RowChange::Insert { row });
        assert_eq!(thread.len(), 1);
    }

    #[test]
    fn update_is_last_write_wins() {
        let mut thread = MessageThread::new();
        let mut row = message(10, "before");
        thread.apply(RowChange::Insert { row: row.clone() });

        row.content = "after".to_string();
        row.edited_at = Some(Utc::now());
        thread.apply(RowChange::Update { row });

        assert_eq!(contents(&thread), ["after"]);
    }

    #[test]
    fn delete_removes_row_and_unknown_delete_is_noop() {
        let mut thread = MessageThread::new();
        let row = message(10, "a");
        let id = row.id;
        thread.apply(RowChange::Insert { row });
        thread.apply(RowChange::Delete { id: Uuid::new_v4() });
        assert_eq!(thread.len(), 1);
        thread.apply(RowChange::Delete { id });
        assert!(thread.is_empty());
    }
}
