//! Plan limits and billing state.
//!
//! Creation actions are gated client- and server-side by comparing current
//! usage to the plan limits; hitting a limit is a soft domain outcome (the
//! route answers `{ success: false, code }`), not a server error. Billing is
//! a human-reviewed workflow: a payment screenshot is submitted, an
//! administrator verifies it, and the subscription turns active for another
//! period. After the period lapses a grace window keeps the workspace
//! writable before it degrades to read-only.

use chrono::{DateTime, Duration, Utc};
use db::{
    projects::{ProjectError, ProjectRepository},
    subscriptions::{SubscriptionError, SubscriptionRepository, SubscriptionWithPlan},
    types::SubscriptionStatus,
    workspace_members::{WorkspaceMemberError, WorkspaceMemberRepository},
};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

pub const GRACE_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum SubscriptionServiceError {
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
    #[error(transparent)]
    Member(#[from] WorkspaceMemberError),
    #[error(transparent)]
    Project(#[from] ProjectError),
}

/// What the workspace may currently do, derived from billing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AccessState {
    /// Trial or paid period running, or inside the grace window.
    Full,
    /// Period lapsed beyond grace; reads allowed, writes gated.
    ReadOnly,
}

pub fn access_state(subscription: &SubscriptionWithPlan, now: DateTime<Utc>) -> AccessState {
    let deadline = match subscription.status {
        SubscriptionStatus::Trial => subscription.trial_ends_at,
        SubscriptionStatus::Active | SubscriptionStatus::Grace => {
            subscription.current_period_ends_at
        }
        SubscriptionStatus::Expired => None,
    };

    match (subscription.status, deadline) {
        (SubscriptionStatus::Expired, _) => AccessState::ReadOnly,
        (_, None) => AccessState::Full,
        (_, Some(deadline)) => {
            if now <= deadline + Duration::days(GRACE_DAYS) {
                AccessState::Full
            } else {
                AccessState::ReadOnly
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PlanUsage {
    pub member_count: i64,
    pub max_members: i32,
    pub project_count: i64,
    pub max_projects: i32,
}

impl PlanUsage {
    pub fn can_add_member(&self) -> bool {
        self.member_count < self.max_members as i64
    }

    pub fn can_add_project(&self) -> bool {
        self.project_count < self.max_projects as i64
    }
}

#[derive(Clone, Default)]
pub struct SubscriptionService;

impl SubscriptionService {
    pub fn new() -> Self {
        Self
    }

    pub async fn usage(
        &self,
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Option<PlanUsage>, SubscriptionServiceError> {
        let Some(subscription) =
            SubscriptionRepository::current_for_workspace(pool, workspace_id).await?
        else {
            return Ok(None);
        };

        let member_count = WorkspaceMemberRepository::count_by_workspace(pool, workspace_id).await?;
        let project_count = ProjectRepository::count_by_workspace(pool, workspace_id).await?;

        Ok(Some(PlanUsage {
            member_count,
            max_members: subscription.max_members,
            project_count,
            max_projects: subscription.max_projects,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(status: SubscriptionStatus) -> SubscriptionWithPlan {
        SubscriptionWithPlan {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            status,
            trial_ends_at: None,
            current_period_ends_at: None,
            payment_screenshot_url: None,
            plan_id: Uuid::new_v4(),
            plan_name: "Team".to_string(),
            max_members: 10,
            max_projects: 5,
        }
    }

    #[test]
    fn usage_gates_at_exactly_the_limit() {
        let usage = PlanUsage {
            member_count: 9,
            max_members: 10,
            project_count: 5,
            max_projects: 5,
        };
        assert!(usage.can_add_member());
        assert!(!usage.can_add_project());
    }

    #[test]
    fn active_period_with_grace_window() {
        let now = Utc::now();
        let mut sub = subscription(SubscriptionStatus::Active);

        sub.current_period_ends_at = Some(now + Duration::days(10));
        assert_eq!(access_state(&sub, now), AccessState::Full);

        // Lapsed three days ago, still inside grace.
        sub.current_period_ends_at = Some(now - Duration::days(3));
        assert_eq!(access_state(&sub, now), AccessState::Full);

        // Beyond grace.
        sub.current_period_ends_at = Some(now - Duration::days(GRACE_DAYS + 1));
        assert_eq!(access_state(&sub, now), AccessState::ReadOnly);
    }

    #[test]
    fn trial_uses_trial_deadline() {
        let now = Utc::now();
        let mut sub = subscription(SubscriptionStatus::Trial);
        sub.trial_ends_at = Some(now + Duration::days(1));
        assert_eq!(access_state(&sub, now), AccessState::Full);

        sub.trial_ends_at = Some(now - Duration::days(GRACE_DAYS + 1));
        assert_eq!(access_state(&sub, now), AccessState::ReadOnly);
    }

    #[test]
    fn expired_is_read_only_regardless_of_dates() {
        let now = Utc::now();
        let mut sub = subscription(SubscriptionStatus::Expired);
        sub.current_period_ends_at = Some(now + Duration::days(30));
        assert_eq!(access_state(&sub, now), AccessState::ReadOnly);
    }
}
