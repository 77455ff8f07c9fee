use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::types::{ActivityAction, NotificationTarget};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct ActivityLog {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub project_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub action: ActivityAction,
    pub target_type: NotificationTarget,
    pub target_id: Uuid,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ActivityLogError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct ActivityLogRepository;

impl ActivityLogRepository {
    pub async fn recent_by_workspace<'e, E>(
        executor: E,
        workspace_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActivityLog>, ActivityLogError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, workspace_id, project_id, actor_id, action, target_type, target_id,
                   detail, created_at
            FROM activity_logs
            WHERE workspace_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(workspace_id)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record<'e, E>(
        executor: E,
        workspace_id: Uuid,
        project_id: Option<Uuid>,
        actor_id: Uuid,
        action: ActivityAction,
        target_type: NotificationTarget,
        target_id: Uuid,
        detail: Option<String>,
    ) -> Result<ActivityLog, ActivityLogError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs
                (id, workspace_id, project_id, actor_id, action, target_type, target_id, detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING id, workspace_id, project_id, actor_id, action, target_type, target_id,
                      detail, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(project_id)
        .bind(actor_id)
        .bind(action)
        .bind(target_type)
        .bind(target_id)
        .bind(detail)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }
}
