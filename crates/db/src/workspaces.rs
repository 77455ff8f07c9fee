use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

/// Tenant boundary. Every project, channel, and subscription hangs off one
/// of these.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct WorkspaceRepository;

impl WorkspaceRepository {
    pub async fn find_by_id<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Workspace>, WorkspaceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, name, owner_user_id, created_at, updated_at
            FROM workspaces
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn list_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Workspace>, WorkspaceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT w.id, w.name, w.owner_user_id, w.created_at, w.updated_at
            FROM workspaces w
            INNER JOIN workspace_members m ON m.workspace_id = w.id
            WHERE m.user_id = $1
            ORDER BY w.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn create<'e, E>(
        executor: E,
        name: String,
        owner_user_id: Uuid,
    ) -> Result<Workspace, WorkspaceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (id, name, owner_user_id, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING id, name, owner_user_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(owner_user_id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn rename<'e, E>(
        executor: E,
        id: Uuid,
        name: String,
    ) -> Result<Workspace, WorkspaceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces
            SET name = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, name, owner_user_id, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<(), WorkspaceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
