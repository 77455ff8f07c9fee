use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::types::NotificationKind;

/// Per-user delivery toggles plus an optional quiet-hours window in the
/// user's local time ("HH:MM" strings, may wrap midnight).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct NotificationPreferences {
    pub user_id: Uuid,
    pub task_assigned: bool,
    pub task_completed: bool,
    pub comment_added: bool,
    pub chat_message: bool,
    pub member_joined: bool,
    pub payment_verified: bool,
    pub workspace_event: bool,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub timezone: String,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreferences {
    pub fn defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            task_assigned: true,
            task_completed: true,
            comment_added: true,
            chat_message: true,
            member_joined: true,
            payment_verified: true,
            workspace_event: true,
            quiet_hours_start: None,
            quiet_hours_end: None,
            timezone: "UTC".to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn allows(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::TaskAssigned => self.task_assigned,
            NotificationKind::TaskCompleted => self.task_completed,
            NotificationKind::CommentAdded => self.comment_added,
            NotificationKind::ChatMessage => self.chat_message,
            NotificationKind::MemberJoined => self.member_joined,
            NotificationKind::PaymentVerified => self.payment_verified,
            NotificationKind::WorkspaceEvent => self.workspace_event,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct PushSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    pub platform: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum NotificationPreferenceError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const PREF_COLUMNS: &str = "user_id, task_assigned, task_completed, comment_added, chat_message, \
     member_joined, payment_verified, workspace_event, quiet_hours_start, quiet_hours_end, \
     timezone, updated_at";

pub struct NotificationPreferenceRepository;

impl NotificationPreferenceRepository {
    /// Missing row means the user never saved preferences; callers fall back
    /// to [`NotificationPreferences::defaults`].
    pub async fn find<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<NotificationPreferences>, NotificationPreferenceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, NotificationPreferences>(&format!(
            "SELECT {PREF_COLUMNS} FROM notification_preferences WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn upsert<'e, E>(
        executor: E,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, NotificationPreferenceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, NotificationPreferences>(&format!(
            r#"
            INSERT INTO notification_preferences
                (user_id, task_assigned, task_completed, comment_added, chat_message,
                 member_joined, payment_verified, workspace_event,
                 quiet_hours_start, quiet_hours_end, timezone, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                task_assigned = EXCLUDED.task_assigned,
                task_completed = EXCLUDED.task_completed,
                comment_added = EXCLUDED.comment_added,
                chat_message = EXCLUDED.chat_message,
                member_joined = EXCLUDED.member_joined,
                payment_verified = EXCLUDED.payment_verified,
                workspace_event = EXCLUDED.workspace_event,
                quiet_hours_start = EXCLUDED.quiet_hours_start,
                quiet_hours_end = EXCLUDED.quiet_hours_end,
                timezone = EXCLUDED.timezone,
                updated_at = NOW()
            RETURNING {PREF_COLUMNS}
            "#
        ))
        .bind(prefs.user_id)
        .bind(prefs.task_assigned)
        .bind(prefs.task_completed)
        .bind(prefs.comment_added)
        .bind(prefs.chat_message)
        .bind(prefs.member_joined)
        .bind(prefs.payment_verified)
        .bind(prefs.workspace_event)
        .bind(&prefs.quiet_hours_start)
        .bind(&prefs.quiet_hours_end)
        .bind(&prefs.timezone)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn list_push_subscriptions<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<PushSubscription>, NotificationPreferenceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, PushSubscription>(
            r#"
            SELECT id, user_id, device_id, platform, token, created_at, updated_at
            FROM push_subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// Device tokens rotate, so registration is an upsert keyed on
    /// (user, device).
    pub async fn upsert_push_subscription<'e, E>(
        executor: E,
        user_id: Uuid,
        device_id: String,
        platform: String,
        token: String,
    ) -> Result<PushSubscription, NotificationPreferenceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, PushSubscription>(
            r#"
            INSERT INTO push_subscriptions (id, user_id, device_id, platform, token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (user_id, device_id) DO UPDATE SET
                platform = EXCLUDED.platform,
                token = EXCLUDED.token,
                updated_at = NOW()
            RETURNING id, user_id, device_id, platform, token, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(device_id)
        .bind(platform)
        .bind(token)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn delete_push_subscription<'e, E>(
        executor: E,
        user_id: Uuid,
        device_id: &str,
    ) -> Result<(), NotificationPreferenceError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM push_subscriptions WHERE user_id = $1 AND device_id = $2")
            .bind(user_id)
            .bind(device_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
