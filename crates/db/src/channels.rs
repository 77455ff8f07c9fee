use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct Channel {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("channel name already taken")]
    NameTaken,
}

pub struct ChannelRepository;

impl ChannelRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Channel>, ChannelError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, workspace_id, name, created_by, created_at
            FROM channels
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn list_by_workspace<'e, E>(
        executor: E,
        workspace_id: Uuid,
    ) -> Result<Vec<Channel>, ChannelError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, workspace_id, name, created_by, created_at
            FROM channels
            WHERE workspace_id = $1
            ORDER BY name
            "#,
        )
        .bind(workspace_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn create<'e, E>(
        executor: E,
        workspace_id: Uuid,
        name: String,
        created_by: Uuid,
    ) -> Result<Channel, ChannelError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query_as::<_, Channel>(
            r#"
            INSERT INTO channels (id, workspace_id, name, created_by, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, workspace_id, name, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(name)
        .bind(created_by)
        .fetch_one(executor)
        .await;

        match result {
            Ok(record) => Ok(record),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(ChannelError::NameTaken),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn rename<'e, E>(executor: E, id: Uuid, name: String) -> Result<Channel, ChannelError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Channel>(
            r#"
            UPDATE channels
            SET name = $1
            WHERE id = $2
            RETURNING id, workspace_id, name, created_by, created_at
            "#,
        )
        .bind(name)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<(), ChannelError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
