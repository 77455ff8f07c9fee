//! In-process realtime fan-out. Committed writes publish typed row-change
//! events tagged with a scope; WebSocket sessions subscribe and forward the
//! events whose scope they asked for. A lagging subscriber loses its slot in
//! the ring buffer and is expected to reconnect and refetch.

use db::{channel_messages::ChannelMessage, dm::DmMessage, notifications::Notification};
use serde::Serialize;
use tokio::sync::broadcast;
use ts_rs::TS;
use uuid::Uuid;

/// Which stream of rows an event belongs to. Subscriptions filter on exact
/// scope equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "scope", rename_all = "snake_case")]
#[ts(export)]
pub enum EventScope {
    Channel { channel_id: Uuid },
    Conversation { conversation_id: Uuid },
    Notifications { workspace_id: Uuid, user_id: Uuid },
}

/// Insert and update carry the full row; delete carries only the id.
/// Consumers apply these with last-write-wins semantics.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "op", rename_all = "lowercase")]
#[ts(export)]
pub enum RowChange<T> {
    Insert { row: T },
    Update { row: T },
    Delete { id: Uuid },
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "table", rename_all = "snake_case")]
#[ts(export)]
pub enum ChangePayload {
    ChannelMessage(RowChange<ChannelMessage>),
    DmMessage(RowChange<DmMessage>),
    Notification(RowChange<Notification>),
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ChangeEvent {
    pub scope: EventScope,
    pub payload: ChangePayload,
}

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Publishing without subscribers is not an error; the event is simply
    /// dropped.
    pub fn publish(&self, scope: EventScope, payload: ChangePayload) {
        let _ = self.tx.send(ChangeEvent { scope, payload });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn message(channel_id: Uuid) -> ChannelMessage {
        ChannelMessage {
            id: Uuid::new_v4(),
            channel_id,
            sender_id: Uuid::new_v4(),
            content: "hello".to_string(),
            reply_to_id: None,
            edited_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_see_only_matching_scope() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();

        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        hub.publish(
            EventScope::Channel { channel_id: other },
            ChangePayload::ChannelMessage(RowChange::Insert {
                row: message(other),
            }),
        );
        hub.publish(
            EventScope::Channel { channel_id: mine },
            ChangePayload::ChannelMessage(RowChange::Insert { row: message(mine) }),
        );

        let scope = EventScope::Channel { channel_id: mine };
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.scope == scope {
                seen.push(event);
            }
        }
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let hub = EventHub::new();
        let id = Uuid::new_v4();
        hub.publish(
            EventScope::Channel { channel_id: id },
            ChangePayload::ChannelMessage(RowChange::Delete { id }),
        );
    }
}
