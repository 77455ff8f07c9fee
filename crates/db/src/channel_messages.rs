use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct ChannelMessage {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ChannelMessageError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("message not found or not owned by caller")]
    NotOwned,
}

pub struct ChannelMessageRepository;

impl ChannelMessageRepository {
    /// Latest page, newest first. The client (or `MessageThread`) reverses
    /// it into ascending order before merging.
    pub async fn page_desc<'e, E>(
        executor: E,
        channel_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ChannelMessage>, ChannelMessageError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, ChannelMessage>(
            r#"
            SELECT id, channel_id, sender_id, content, reply_to_id, edited_at, created_at
            FROM channel_messages
            WHERE channel_id = $1
              AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(channel_id)
        .bind(before)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn create<'e, E>(
        executor: E,
        channel_id: Uuid,
        sender_id: Uuid,
        content: String,
        reply_to_id: Option<Uuid>,
    ) -> Result<ChannelMessage, ChannelMessageError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ChannelMessage>(
            r#"
            INSERT INTO channel_messages (id, channel_id, sender_id, content, reply_to_id, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, channel_id, sender_id, content, reply_to_id, edited_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(channel_id)
        .bind(sender_id)
        .bind(content)
        .bind(reply_to_id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    /// Edit scoped to the author by predicate; an update that matches no row
    /// means the message is missing or belongs to someone else.
    pub async fn edit_own<'e, E>(
        executor: E,
        id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<ChannelMessage, ChannelMessageError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ChannelMessage>(
            r#"
            UPDATE channel_messages
            SET content = $1, edited_at = NOW()
            WHERE id = $2 AND sender_id = $3
            RETURNING id, channel_id, sender_id, content, reply_to_id, edited_at, created_at
            "#,
        )
        .bind(content)
        .bind(id)
        .bind(sender_id)
        .fetch_optional(executor)
        .await?;

        record.ok_or(ChannelMessageError::NotOwned)
    }

    /// Deletes the author's own message and returns the deleted row, so the
    /// caller can scope follow-up events to the channel the row actually
    /// belonged to.
    pub async fn delete_own<'e, E>(
        executor: E,
        id: Uuid,
        sender_id: Uuid,
    ) -> Result<ChannelMessage, ChannelMessageError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ChannelMessage>(
            r#"
            DELETE FROM channel_messages
            WHERE id = $1 AND sender_id = $2
            RETURNING id, channel_id, sender_id, content, reply_to_id, edited_at, created_at
            "#,
        )
        .bind(id)
        .bind(sender_id)
        .fetch_optional(executor)
        .await?;

        record.ok_or(ChannelMessageError::NotOwned)
    }
}
