use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::types::{NotificationKind, NotificationTarget};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub target_type: NotificationTarget,
    pub target_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, workspace_id, kind, title, body, target_type, target_id, read, created_at";

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn page_desc<'e, E>(
        executor: E,
        user_id: Uuid,
        workspace_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Notification>, NotificationError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = $1 AND workspace_id = $2
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#
        ))
        .bind(user_id)
        .bind(workspace_id)
        .bind(before)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn unread_count<'e, E>(
        executor: E,
        user_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<i64, NotificationError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE user_id = $1 AND workspace_id = $2 AND read = FALSE
            "#,
        )
        .bind(user_id)
        .bind(workspace_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        executor: E,
        user_id: Uuid,
        workspace_id: Uuid,
        kind: NotificationKind,
        title: String,
        body: Option<String>,
        target_type: NotificationTarget,
        target_id: Uuid,
    ) -> Result<Notification, NotificationError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications
                (id, user_id, workspace_id, kind, title, body, target_type, target_id, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, NOW())
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(workspace_id)
        .bind(kind)
        .bind(title)
        .bind(body)
        .bind(target_type)
        .bind(target_id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn mark_read<'e, E>(
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<(), NotificationError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn mark_all_read<'e, E>(
        executor: E,
        user_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<u64, NotificationError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND workspace_id = $2 AND read = FALSE",
        )
        .bind(user_id)
        .bind(workspace_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> Result<(), NotificationError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
