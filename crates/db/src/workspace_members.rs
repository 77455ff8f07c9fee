use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::types::WorkspaceRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct WorkspaceMember {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
}

/// Member row joined with the user's profile, the shape the member list and
/// the dashboard consume.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct MemberProfile {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum WorkspaceMemberError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("already a member")]
    AlreadyMember,
}

pub struct WorkspaceMemberRepository;

impl WorkspaceMemberRepository {
    pub async fn find_by_id<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<WorkspaceMember>, WorkspaceMemberError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WorkspaceMember>(
            r#"
            SELECT id, workspace_id, user_id, role, joined_at
            FROM workspace_members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn find<'e, E>(
        executor: E,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorkspaceMember>, WorkspaceMemberError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WorkspaceMember>(
            r#"
            SELECT id, workspace_id, user_id, role, joined_at
            FROM workspace_members
            WHERE workspace_id = $1 AND user_id = $2
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn list_profiles<'e, E>(
        executor: E,
        workspace_id: Uuid,
    ) -> Result<Vec<MemberProfile>, WorkspaceMemberError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, MemberProfile>(
            r#"
            SELECT m.id, m.workspace_id, m.user_id, m.role, m.joined_at,
                   u.display_name, u.avatar_url
            FROM workspace_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.workspace_id = $1
            ORDER BY m.joined_at
            "#,
        )
        .bind(workspace_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn add<'e, E>(
        executor: E,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> Result<WorkspaceMember, WorkspaceMemberError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query_as::<_, WorkspaceMember>(
            r#"
            INSERT INTO workspace_members (id, workspace_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, workspace_id, user_id, role, joined_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await;

        match result {
            Ok(record) => Ok(record),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(WorkspaceMemberError::AlreadyMember)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_role<'e, E>(
        executor: E,
        id: Uuid,
        role: WorkspaceRole,
    ) -> Result<WorkspaceMember, WorkspaceMemberError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WorkspaceMember>(
            r#"
            UPDATE workspace_members
            SET role = $1
            WHERE id = $2
            RETURNING id, workspace_id, user_id, role, joined_at
            "#,
        )
        .bind(role)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn remove<'e, E>(executor: E, id: Uuid) -> Result<(), WorkspaceMemberError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM workspace_members WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn count_by_workspace<'e, E>(
        executor: E,
        workspace_id: Uuid,
    ) -> Result<i64, WorkspaceMemberError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM workspace_members WHERE workspace_id = $1",
        )
        .bind(workspace_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }
}
