use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::types::TaskPriority;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub status_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub position: f64,
    pub created_by: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub timer_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub position: f64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct UpdateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const TASK_COLUMNS: &str = "id, project_id, status_id, title, description, priority, \
     assignee_id, due_date, position, created_by, completed_at, timer_started_at, \
     created_at, updated_at";

pub struct TaskRepository;

impl TaskRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Task>, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<Task>, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY position"
        ))
        .bind(project_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// Every task of a set of projects in one query. The dashboard snapshot
    /// reads all workspace tasks through this rather than one query per
    /// project.
    pub async fn list_by_projects<'e, E>(
        executor: E,
        project_ids: &[Uuid],
    ) -> Result<Vec<Task>, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ANY($1)"
        ))
        .bind(project_ids)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        status_id: Uuid,
        created_by: Uuid,
        payload: &CreateTask,
    ) -> Result<Task, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks
                (id, project_id, status_id, title, description, priority, assignee_id,
                 due_date, position, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(status_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.priority)
        .bind(payload.assignee_id)
        .bind(payload.due_date)
        .bind(payload.position)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        payload: &UpdateTask,
    ) -> Result<Task, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = $1, description = $2, priority = $3, assignee_id = $4,
                due_date = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.priority)
        .bind(payload.assignee_id)
        .bind(payload.due_date)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    /// Moves a task to another status. `completed_at` is stamped when the
    /// target status carries `is_completed` and cleared otherwise, in the
    /// same statement, so a task is never completed under a non-completed
    /// status.
    pub async fn set_status<'e, E>(
        executor: E,
        id: Uuid,
        status_id: Uuid,
    ) -> Result<Task, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status_id = $1,
                completed_at = CASE
                    WHEN (SELECT is_completed FROM project_statuses WHERE id = $1)
                    THEN COALESCE(completed_at, NOW())
                    ELSE NULL
                END,
                updated_at = NOW()
            WHERE id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(status_id)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn set_position<'e, E>(
        executor: E,
        id: Uuid,
        position: f64,
    ) -> Result<Task, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET position = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(position)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn set_timer<'e, E>(
        executor: E,
        id: Uuid,
        timer_started_at: Option<DateTime<Utc>>,
    ) -> Result<Task, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET timer_started_at = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(timer_started_at)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<(), TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn workspace_id<'e, E>(executor: E, task_id: Uuid) -> Result<Option<Uuid>, TaskError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT p.workspace_id
            FROM tasks t
            INNER JOIN projects p ON p.id = t.project_id
            WHERE t.id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }
}
