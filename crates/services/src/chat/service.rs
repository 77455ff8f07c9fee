use db::{
    channel_messages::{ChannelMessage, ChannelMessageError, ChannelMessageRepository},
    dm::{DmError, DmMessage, DmRepository},
};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::events::{ChangePayload, EventHub, EventScope, RowChange};

pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Error)]
pub enum ChatServiceError {
    #[error(transparent)]
    ChannelMessage(#[from] ChannelMessageError),
    #[error(transparent)]
    Dm(#[from] DmError),
}

/// Event scope for a channel message. Always derived from the row itself,
/// never from caller-supplied ids, so an event can only land in the stream
/// of the channel the row belongs to.
fn channel_scope(message: &ChannelMessage) -> EventScope {
    EventScope::Channel {
        channel_id: message.channel_id,
    }
}

fn conversation_scope(message: &DmMessage) -> EventScope {
    EventScope::Conversation {
        conversation_id: message.conversation_id,
    }
}

/// Messaging operations shared by the channel and DM routes. Every
/// committed write publishes the corresponding change event so open
/// realtime sessions converge without refetching.
#[derive(Clone)]
pub struct ChatService {
    events: EventHub,
}

impl ChatService {
    pub fn new(events: EventHub) -> Self {
        Self { events }
    }

    pub async fn channel_page(
        &self,
        pool: &PgPool,
        channel_id: Uuid,
        before: Option<chrono::DateTime<chrono::Utc>>,
        limit: Option<i64>,
    ) -> Result<Vec<ChannelMessage>, ChatServiceError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 200);
        let page = ChannelMessageRepository::page_desc(pool, channel_id, before, limit).await?;
        Ok(page)
    }

    pub async fn send_channel_message(
        &self,
        pool: &PgPool,
        channel_id: Uuid,
        sender_id: Uuid,
        content: String,
        reply_to_id: Option<Uuid>,
    ) -> Result<ChannelMessage, ChatServiceError> {
        let message =
            ChannelMessageRepository::create(pool, channel_id, sender_id, content, reply_to_id)
                .await?;

        self.events.publish(
            channel_scope(&message),
            ChangePayload::ChannelMessage(RowChange::Insert {
                row: message.clone(),
            }),
        );

        Ok(message)
    }

    pub async fn edit_channel_message(
        &self,
        pool: &PgPool,
        id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<ChannelMessage, ChatServiceError> {
        let message = ChannelMessageRepository::edit_own(pool, id, sender_id, content).await?;

        self.events.publish(
            channel_scope(&message),
            ChangePayload::ChannelMessage(RowChange::Update {
                row: message.clone(),
            }),
        );

        Ok(message)
    }

    pub async fn delete_channel_message(
        &self,
        pool: &PgPool,
        id: Uuid,
        sender_id: Uuid,
    ) -> Result<(), ChatServiceError> {
        let deleted = ChannelMessageRepository::delete_own(pool, id, sender_id).await?;

        self.events.publish(
            channel_scope(&deleted),
            ChangePayload::ChannelMessage(RowChange::Delete { id }),
        );

        Ok(())
    }

    pub async fn dm_page(
        &self,
        pool: &PgPool,
        conversation_id: Uuid,
        before: Option<chrono::DateTime<chrono::Utc>>,
        limit: Option<i64>,
    ) -> Result<Vec<DmMessage>, ChatServiceError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 200);
        let page = DmRepository::page_messages_desc(pool, conversation_id, before, limit).await?;
        Ok(page)
    }

    pub async fn send_dm_message(
        &self,
        pool: &PgPool,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<DmMessage, ChatServiceError> {
        let message = DmRepository::create_message(pool, conversation_id, sender_id, content).await?;

        self.events.publish(
            conversation_scope(&message),
            ChangePayload::DmMessage(RowChange::Insert {
                row: message.clone(),
            }),
        );

        Ok(message)
    }

    pub async fn edit_dm_message(
        &self,
        pool: &PgPool,
        id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<DmMessage, ChatServiceError> {
        let message = DmRepository::edit_own_message(pool, id, sender_id, content).await?;

        self.events.publish(
            conversation_scope(&message),
            ChangePayload::DmMessage(RowChange::Update {
                row: message.clone(),
            }),
        );

        Ok(message)
    }

    pub async fn delete_dm_message(
        &self,
        pool: &PgPool,
        id: Uuid,
        sender_id: Uuid,
    ) -> Result<(), ChatServiceError> {
        let deleted = DmRepository::delete_own_message(pool, id, sender_id).await?;

        self.events.publish(
            conversation_scope(&deleted),
            ChangePayload::DmMessage(RowChange::Delete { id }),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn event_scope_comes_from_the_row() {
        let channel_id = Uuid::new_v4();
        let message = ChannelMessage {
            id: Uuid::new_v4(),
            channel_id,
            sender_id: Uuid::new_v4(),
            content: "hello".to_string(),
            reply_to_id: None,
            edited_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(channel_scope(&message), EventScope::Channel { channel_id });

        let conversation_id = Uuid::new_v4();
        let dm = DmMessage {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Uuid::new_v4(),
            content: "hello".to_string(),
            edited_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            conversation_scope(&dm),
            EventScope::Conversation { conversation_id }
        );
    }
}
