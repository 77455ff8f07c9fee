use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

/// Direct-message conversation between two workspace members. The pair is
/// stored ordered (`user_a < user_b`) so one row exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct DmConversation {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct DmMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DmError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("message not found or not owned by caller")]
    NotOwned,
}

pub struct DmRepository;

impl DmRepository {
    pub async fn find_conversation<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<DmConversation>, DmError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, DmConversation>(
            r#"
            SELECT id, workspace_id, user_a, user_b, created_at
            FROM dm_conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn find_or_create_conversation<'e, E>(
        executor: E,
        workspace_id: Uuid,
        first: Uuid,
        second: Uuid,
    ) -> Result<DmConversation, DmError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (user_a, user_b) = if first < second {
            (first, second)
        } else {
            (second, first)
        };

        let record = sqlx::query_as::<_, DmConversation>(
            r#"
            INSERT INTO dm_conversations (id, workspace_id, user_a, user_b, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (workspace_id, user_a, user_b)
                DO UPDATE SET workspace_id = EXCLUDED.workspace_id
            RETURNING id, workspace_id, user_a, user_b, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(user_a)
        .bind(user_b)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn list_conversations_for_user<'e, E>(
        executor: E,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<DmConversation>, DmError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, DmConversation>(
            r#"
            SELECT id, workspace_id, user_a, user_b, created_at
            FROM dm_conversations
            WHERE workspace_id = $1 AND (user_a = $2 OR user_b = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn page_messages_desc<'e, E>(
        executor: E,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<DmMessage>, DmError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, DmMessage>(
            r#"
            SELECT id, conversation_id, sender_id, content, edited_at, created_at
            FROM dm_messages
            WHERE conversation_id = $1
              AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(conversation_id)
        .bind(before)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn create_message<'e, E>(
        executor: E,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<DmMessage, DmError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, DmMessage>(
            r#"
            INSERT INTO dm_messages (id, conversation_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, conversation_id, sender_id, content, edited_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn edit_own_message<'e, E>(
        executor: E,
        id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<DmMessage, DmError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, DmMessage>(
            r#"
            UPDATE dm_messages
            SET content = $1, edited_at = NOW()
            WHERE id = $2 AND sender_id = $3
            RETURNING id, conversation_id, sender_id, content, edited_at, created_at
            "#,
        )
        .bind(content)
        .bind(id)
        .bind(sender_id)
        .fetch_optional(executor)
        .await?;

        record.ok_or(DmError::NotOwned)
    }

    /// Deletes the sender's own message and returns the deleted row, so the
    /// caller can scope follow-up events to the conversation the row
    /// actually belonged to.
    pub async fn delete_own_message<'e, E>(
        executor: E,
        id: Uuid,
        sender_id: Uuid,
    ) -> Result<DmMessage, DmError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, DmMessage>(
            r#"
            DELETE FROM dm_messages
            WHERE id = $1 AND sender_id = $2
            RETURNING id, conversation_id, sender_id, content, edited_at, created_at
            "#,
        )
        .bind(id)
        .bind(sender_id)
        .fetch_optional(executor)
        .await?;

        record.ok_or(DmError::NotOwned)
    }
}
