use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::types::SubscriptionStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub max_members: i32,
    pub max_projects: i32,
    pub price_per_month: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct WorkspaceSubscription {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub current_period_ends_at: Option<DateTime<Utc>>,
    pub payment_screenshot_url: Option<String>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription joined with its plan, the shape limit checks consume.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct SubscriptionWithPlan {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub current_period_ends_at: Option<DateTime<Utc>>,
    pub payment_screenshot_url: Option<String>,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub max_members: i32,
    pub max_projects: i32,
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("workspace has no subscription")]
    NoSubscription,
}

const SUBSCRIPTION_COLUMNS: &str = "id, workspace_id, plan_id, status, trial_ends_at, \
     current_period_ends_at, payment_screenshot_url, verified_by, verified_at, \
     created_at, updated_at";

pub struct SubscriptionRepository;

impl SubscriptionRepository {
    pub async fn list_plans<'e, E>(executor: E) -> Result<Vec<SubscriptionPlan>, SubscriptionError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, name, max_members, max_projects, price_per_month
            FROM subscription_plans
            ORDER BY price_per_month
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    pub async fn current_for_workspace<'e, E>(
        executor: E,
        workspace_id: Uuid,
    ) -> Result<Option<SubscriptionWithPlan>, SubscriptionError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, SubscriptionWithPlan>(
            r#"
            SELECT s.id, s.workspace_id, s.status, s.trial_ends_at, s.current_period_ends_at,
                   s.payment_screenshot_url,
                   p.id AS plan_id, p.name AS plan_name, p.max_members, p.max_projects
            FROM workspace_subscriptions s
            INNER JOIN subscription_plans p ON p.id = s.plan_id
            WHERE s.workspace_id = $1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn start_trial<'e, E>(
        executor: E,
        workspace_id: Uuid,
        plan_id: Uuid,
        trial_ends_at: DateTime<Utc>,
    ) -> Result<WorkspaceSubscription, SubscriptionError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WorkspaceSubscription>(&format!(
            r#"
            INSERT INTO workspace_subscriptions
                (id, workspace_id, plan_id, status, trial_ends_at, created_at, updated_at)
            VALUES ($1, $2, $3, 'trial', $4, NOW(), NOW())
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(plan_id)
        .bind(trial_ends_at)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    /// Records the uploaded payment screenshot. The subscription stays in
    /// its current status until an admin verifies.
    pub async fn submit_payment<'e, E>(
        executor: E,
        workspace_id: Uuid,
        plan_id: Uuid,
        screenshot_url: String,
    ) -> Result<WorkspaceSubscription, SubscriptionError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WorkspaceSubscription>(&format!(
            r#"
            UPDATE workspace_subscriptions
            SET plan_id = $1, payment_screenshot_url = $2,
                verified_by = NULL, verified_at = NULL, updated_at = NOW()
            WHERE workspace_id = $3
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(plan_id)
        .bind(screenshot_url)
        .bind(workspace_id)
        .fetch_optional(executor)
        .await?;

        record.ok_or(SubscriptionError::NoSubscription)
    }

    pub async fn verify_payment<'e, E>(
        executor: E,
        workspace_id: Uuid,
        verified_by: Uuid,
        period_ends_at: DateTime<Utc>,
    ) -> Result<WorkspaceSubscription, SubscriptionError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WorkspaceSubscription>(&format!(
            r#"
            UPDATE workspace_subscriptions
            SET status = 'active', current_period_ends_at = $1,
                verified_by = $2, verified_at = NOW(), updated_at = NOW()
            WHERE workspace_id = $3
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(period_ends_at)
        .bind(verified_by)
        .bind(workspace_id)
        .fetch_optional(executor)
        .await?;

        record.ok_or(SubscriptionError::NoSubscription)
    }

    pub async fn set_status<'e, E>(
        executor: E,
        workspace_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<WorkspaceSubscription, SubscriptionError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WorkspaceSubscription>(&format!(
            r#"
            UPDATE workspace_subscriptions
            SET status = $1, updated_at = NOW()
            WHERE workspace_id = $2
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(status)
        .bind(workspace_id)
        .fetch_optional(executor)
        .await?;

        record.ok_or(SubscriptionError::NoSubscription)
    }
}
