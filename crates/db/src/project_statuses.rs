use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::Tx;

/// Statuses seeded for each new project (name, color, position, is_default, is_completed)
pub const DEFAULT_STATUSES: &[(&str, &str, i32, bool, bool)] = &[
    ("To do", "#3b82f6", 0, true, false),
    ("In progress", "#f59e0b", 1, false, false),
    ("Done", "#22c55e", 2, false, true),
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct ProjectStatus {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub color: String,
    pub position: i32,
    pub is_default: bool,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ProjectStatusError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("status not found")]
    NotFound,
}

pub struct ProjectStatusRepository;

impl ProjectStatusRepository {
    pub async fn find_by_id<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<ProjectStatus>, ProjectStatusError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ProjectStatus>(
            r#"
            SELECT id, project_id, name, color, position, is_default, is_completed, created_at
            FROM project_statuses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<ProjectStatus>, ProjectStatusError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, ProjectStatus>(
            r#"
            SELECT id, project_id, name, color, position, is_default, is_completed, created_at
            FROM project_statuses
            WHERE project_id = $1
            ORDER BY position
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// One query for every status of a set of projects, used by the
    /// dashboard snapshot.
    pub async fn list_by_projects<'e, E>(
        executor: E,
        project_ids: &[Uuid],
    ) -> Result<Vec<ProjectStatus>, ProjectStatusError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, ProjectStatus>(
            r#"
            SELECT id, project_id, name, color, position, is_default, is_completed, created_at
            FROM project_statuses
            WHERE project_id = ANY($1)
            ORDER BY project_id, position
            "#,
        )
        .bind(project_ids)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        name: String,
        color: String,
        position: i32,
        is_completed: bool,
    ) -> Result<ProjectStatus, ProjectStatusError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ProjectStatus>(
            r#"
            INSERT INTO project_statuses
                (id, project_id, name, color, position, is_default, is_completed, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, NOW())
            RETURNING id, project_id, name, color, position, is_default, is_completed, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(name)
        .bind(color)
        .bind(position)
        .bind(is_completed)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        name: String,
        color: String,
        position: i32,
        is_completed: bool,
    ) -> Result<ProjectStatus, ProjectStatusError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ProjectStatus>(
            r#"
            UPDATE project_statuses
            SET name = $1, color = $2, position = $3, is_completed = $4
            WHERE id = $5
            RETURNING id, project_id, name, color, position, is_default, is_completed, created_at
            "#,
        )
        .bind(name)
        .bind(color)
        .bind(position)
        .bind(is_completed)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<(), ProjectStatusError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM project_statuses WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Marks one status as the project default. Clearing the previous
    /// default and setting the new one happen in the caller's transaction so
    /// the single-default invariant holds throughout.
    pub async fn set_default(tx: &mut Tx<'_>, id: Uuid) -> Result<ProjectStatus, ProjectStatusError> {
        let project_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT project_id FROM project_statuses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(ProjectStatusError::NotFound)?;

        sqlx::query("UPDATE project_statuses SET is_default = FALSE WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut **tx)
            .await?;

        let record = sqlx::query_as::<_, ProjectStatus>(
            r#"
            UPDATE project_statuses
            SET is_default = TRUE
            WHERE id = $1
            RETURNING id, project_id, name, color, position, is_default, is_completed, created_at
            "#,
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    pub async fn create_default_statuses<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<ProjectStatus>, ProjectStatusError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let names: Vec<String> = DEFAULT_STATUSES
            .iter()
            .map(|(n, _, _, _, _)| (*n).to_string())
            .collect();
        let colors: Vec<String> = DEFAULT_STATUSES
            .iter()
            .map(|(_, c, _, _, _)| (*c).to_string())
            .collect();
        let positions: Vec<i32> = DEFAULT_STATUSES.iter().map(|(_, _, p, _, _)| *p).collect();
        let defaults: Vec<bool> = DEFAULT_STATUSES.iter().map(|(_, _, _, d, _)| *d).collect();
        let completed: Vec<bool> = DEFAULT_STATUSES.iter().map(|(_, _, _, _, c)| *c).collect();

        let statuses = sqlx::query_as::<_, ProjectStatus>(
            r#"
            INSERT INTO project_statuses
                (id, project_id, name, color, position, is_default, is_completed, created_at)
            SELECT gen_random_uuid(), $1, name, color, position, is_default, is_completed, NOW()
            FROM UNNEST($2::text[], $3::text[], $4::int[], $5::bool[], $6::bool[])
                AS t(name, color, position, is_default, is_completed)
            RETURNING id, project_id, name, color, position, is_default, is_completed, created_at
            "#,
        )
        .bind(project_id)
        .bind(&names)
        .bind(&colors)
        .bind(&positions)
        .bind(&defaults)
        .bind(&completed)
        .fetch_all(executor)
        .await?;

        Ok(statuses)
    }
}
