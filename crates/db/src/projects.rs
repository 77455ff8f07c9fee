use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub color: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct ProjectRepository;

impl ProjectRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Project>, ProjectError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, workspace_id, name, color, archived, created_at, updated_at
            FROM projects
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
    ) -> Result<Vec<Project>, ProjectError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, workspace_id, name, color, archived, created_at, updated_at
            FROM projects
            WHERE workspace_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(workspace_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// Active (non-archived) projects, the set the dashboard aggregates over.
    pub async fn list_active_by_workspace<'e, E>(
        executor: E,
        workspace_id: Uuid,
    ) -> Result<Vec<Project>, ProjectError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, workspace_id, name, color, archived, created_at, updated_at
            FROM projects
            WHERE workspace_id = $1 AND archived = FALSE
            ORDER BY created_at
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
        color: String,
    ) -> Result<Project, ProjectError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, workspace_id, name, color, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, workspace_id, name, color, archived, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(name)
        .bind(color)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        name: String,
        color: String,
        archived: bool,
    ) -> Result<Project, ProjectError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $1, color = $2, archived = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING id, workspace_id, name, color, archived, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(color)
        .bind(archived)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<(), ProjectError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn count_by_workspace<'e, E>(
        executor: E,
        workspace_id: Uuid,
    ) -> Result<i64, ProjectError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM projects WHERE workspace_id = $1 AND archived = FALSE",
        )
        .bind(workspace_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }
}
