use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Membership role within a workspace. Ordering is by authority:
/// owner > admin > member > viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "workspace_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl WorkspaceRole {
    fn rank(self) -> u8 {
        match self {
            WorkspaceRole::Owner => 3,
            WorkspaceRole::Admin => 2,
            WorkspaceRole::Member => 1,
            WorkspaceRole::Viewer => 0,
        }
    }

    pub fn at_least(self, other: WorkspaceRole) -> bool {
        self.rank() >= other.rank()
    }

    /// Whether a member with this role may change or remove a member
    /// holding `target`. Owners manage everyone below them; admins manage
    /// members and viewers only.
    pub fn can_manage(self, target: WorkspaceRole) -> bool {
        match self {
            WorkspaceRole::Owner => target != WorkspaceRole::Owner,
            WorkspaceRole::Admin => {
                matches!(target, WorkspaceRole::Member | WorkspaceRole::Viewer)
            }
            _ => false,
        }
    }

    pub fn can_mutate(self) -> bool {
        self.at_least(WorkspaceRole::Member)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TaskPriority {
    Urgent,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Grace,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NotificationKind {
    TaskAssigned,
    TaskCompleted,
    CommentAdded,
    ChatMessage,
    MemberJoined,
    PaymentVerified,
    WorkspaceEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "notification_target", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NotificationTarget {
    Task,
    Project,
    Comment,
    Chat,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS)]
#[sqlx(type_name = "activity_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ActivityAction {
    Created,
    Updated,
    Completed,
    Deleted,
    Commented,
    Joined,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy_is_total() {
        let ordered = [
            WorkspaceRole::Owner,
            WorkspaceRole::Admin,
            WorkspaceRole::Member,
            WorkspaceRole::Viewer,
        ];
        for (i, higher) in ordered.iter().enumerate() {
            for lower in &ordered[i..] {
                assert!(higher.at_least(*lower), "{higher:?} >= {lower:?}");
            }
        }
        assert!(!WorkspaceRole::Viewer.at_least(WorkspaceRole::Member));
    }

    #[test]
    fn admins_cannot_touch_owners_or_admins() {
        assert!(WorkspaceRole::Owner.can_manage(WorkspaceRole::Admin));
        assert!(!WorkspaceRole::Owner.can_manage(WorkspaceRole::Owner));
        assert!(WorkspaceRole::Admin.can_manage(WorkspaceRole::Member));
        assert!(!WorkspaceRole::Admin.can_manage(WorkspaceRole::Admin));
        assert!(!WorkspaceRole::Member.can_manage(WorkspaceRole::Viewer));
    }

    #[test]
    fn viewers_cannot_mutate() {
        assert!(!WorkspaceRole::Viewer.can_mutate());
        assert!(WorkspaceRole::Member.can_mutate());
    }
}
