use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use db::{
    activity_logs::ActivityLogRepository,
    types::{ActivityAction, NotificationKind, NotificationTarget, WorkspaceRole},
    users::UserRepository,
    workspace_members::{
        MemberProfile, WorkspaceMember, WorkspaceMemberError, WorkspaceMemberRepository,
    },
    workspaces::WorkspaceRepository,
};
use serde::{Deserialize, Serialize};
use services::functions::{InvitationRequest, RemoveMemberRequest, ResetMemberPasswordRequest};
use sqlx::PgPool;
use tracing::instrument;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::error::ErrorResponse;
use crate::{AppState, auth::RequestContext};

/// Verifies the caller belongs to the workspace and returns their
/// membership row for role checks. Every workspace-scoped route goes
/// through this one predicate.
pub async fn ensure_member_access(
    pool: &PgPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<WorkspaceMember, ErrorResponse> {
    let member = WorkspaceMemberRepository::find(pool, workspace_id, user_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, %user_id, "failed to check membership");
            ErrorResponse::internal()
        })?;

    member.ok_or_else(ErrorResponse::forbidden)
}

/// A role change needs authority over both the member's current role and
/// the role being granted; otherwise an admin could promote a member to
/// admin and then be unable to demote them.
fn may_assign_role(
    caller: WorkspaceRole,
    current: WorkspaceRole,
    granted: WorkspaceRole,
) -> bool {
    caller.can_manage(current) && caller.can_manage(granted)
}

pub async fn ensure_role(
    pool: &PgPool,
    workspace_id: Uuid,
    user_id: Uuid,
    required: WorkspaceRole,
) -> Result<WorkspaceMember, ErrorResponse> {
    let member = ensure_member_access(pool, workspace_id, user_id).await?;
    if !member.role.at_least(required) {
        return Err(ErrorResponse::forbidden());
    }
    Ok(member)
}

#[derive(Debug, Serialize)]
pub struct ListMembersResponse {
    pub members: Vec<MemberProfile>,
}

#[derive(Debug, Deserialize)]
struct InviteMemberRequest {
    email: String,
    role: WorkspaceRole,
}

#[derive(Debug, Deserialize)]
struct UpdateMemberRoleRequest {
    role: WorkspaceRole,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/workspaces/{workspace_id}/members",
            get(list_members).post(invite_member),
        )
        .route(
            "/members/{member_id}",
            patch(update_member_role).delete(remove_member),
        )
        .route(
            "/members/{member_id}/reset-password",
            post(reset_member_password),
        )
}

#[instrument(
    name = "members.list_members",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ListMembersResponse>, ErrorResponse> {
    ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let members = WorkspaceMemberRepository::list_profiles(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to list members");
            ErrorResponse::internal()
        })?;

    Ok(Json(ListMembersResponse { members }))
}

#[instrument(
    name = "members.invite_member",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn invite_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<InviteMemberRequest>,
) -> Result<Json<ApiResponse<WorkspaceMember>>, ErrorResponse> {
    let inviter =
        ensure_role(state.pool(), workspace_id, ctx.user.id, WorkspaceRole::Admin).await?;

    if payload.role == WorkspaceRole::Owner {
        return Err(ErrorResponse::forbidden());
    }

    let usage = state
        .subscriptions()
        .usage(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to load plan usage");
            ErrorResponse::internal()
        })?;

    if let Some(usage) = usage
        && !usage.can_add_member()
    {
        return Ok(Json(ApiResponse::rejected(
            "member limit reached for the current plan",
            "limit_reached",
        )));
    }

    let existing = UserRepository::find_by_email(state.pool(), &payload.email)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to look up invitee");
            ErrorResponse::internal()
        })?;

    let Some(user) = existing else {
        // Unknown address: hand off to the invitation email flow.
        let workspace = WorkspaceRepository::find_by_id(state.pool(), workspace_id)
            .await
            .map_err(|error| {
                tracing::error!(?error, %workspace_id, "failed to load workspace");
                ErrorResponse::internal()
            })?
            .ok_or_else(|| ErrorResponse::not_found("workspace"))?;

        let inviter_profile = UserRepository::find_by_id(state.pool(), inviter.user_id)
            .await
            .map_err(|error| {
                tracing::error!(?error, "failed to load inviter profile");
                ErrorResponse::internal()
            })?;

        let request = InvitationRequest {
            workspace_id,
            workspace_name: workspace.name,
            email: payload.email,
            invited_by: inviter_profile
                .map(|u| u.display_name)
                .unwrap_or_default(),
        };
        if let Err(error) = state.functions().send_invitation(&request).await {
            tracing::error!(?error, "failed to send invitation");
            return Ok(Json(ApiResponse::rejected(
                "failed to send invitation",
                "invitation_failed",
            )));
        }
        return Ok(Json(ApiResponse::rejected(
            "invitation sent; user has no account yet",
            "invitation_sent",
        )));
    };

    let member =
        match WorkspaceMemberRepository::add(state.pool(), workspace_id, user.id, payload.role)
            .await
        {
            Ok(member) => member,
            Err(WorkspaceMemberError::AlreadyMember) => {
                return Ok(Json(ApiResponse::rejected(
                    "already a member",
                    "already_member",
                )));
            }
            Err(error) => {
                tracing::error!(?error, %workspace_id, "failed to add member");
                return Err(ErrorResponse::internal());
            }
        };

    state
        .notifications()
        .notify(
            state.pool(),
            user.id,
            workspace_id,
            NotificationKind::MemberJoined,
            "You were added to a workspace".to_string(),
            None,
            NotificationTarget::Workspace,
            workspace_id,
        )
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to record join notification");
            ErrorResponse::internal()
        })?;

    let activity = ActivityLogRepository::record(
        state.pool(),
        workspace_id,
        None,
        inviter.user_id,
        ActivityAction::Joined,
        NotificationTarget::Workspace,
        user.id,
        Some(user.display_name),
    )
    .await;
    if let Err(error) = activity {
        tracing::warn!(?error, %workspace_id, "failed to record join activity");
    }

    Ok(Json(ApiResponse::success(member)))
}

#[instrument(
    name = "members.update_member_role",
    skip(state, ctx, payload),
    fields(member_id = %member_id, user_id = %ctx.user.id)
)]
async fn update_member_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> Result<Json<WorkspaceMember>, ErrorResponse> {
    let target = find_member(state.pool(), member_id).await?;
    let caller = ensure_member_access(state.pool(), target.workspace_id, ctx.user.id).await?;

    if !may_assign_role(caller.role, target.role, payload.role) {
        return Err(ErrorResponse::forbidden());
    }

    let updated = WorkspaceMemberRepository::update_role(state.pool(), member_id, payload.role)
        .await
        .map_err(|error| {
            tracing::error!(?error, %member_id, "failed to update member role");
            ErrorResponse::internal()
        })?;

    Ok(Json(updated))
}

#[instrument(
    name = "members.remove_member",
    skip(state, ctx),
    fields(member_id = %member_id, user_id = %ctx.user.id)
)]
async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(member_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    let target = find_member(state.pool(), member_id).await?;
    let caller = ensure_member_access(state.pool(), target.workspace_id, ctx.user.id).await?;

    // Leaving is always allowed, except for the owner.
    let leaving_self = target.user_id == ctx.user.id && target.role != WorkspaceRole::Owner;
    if !leaving_self && !caller.role.can_manage(target.role) {
        return Err(ErrorResponse::forbidden());
    }

    WorkspaceMemberRepository::remove(state.pool(), member_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %member_id, "failed to remove member");
            ErrorResponse::internal()
        })?;

    // Auth-side cleanup is best-effort; membership is already gone.
    let request = RemoveMemberRequest {
        workspace_id: target.workspace_id,
        user_id: target.user_id,
    };
    if let Err(error) = state.functions().remove_member(&request).await {
        tracing::warn!(?error, member_id = %member_id, "remove-member dispatch failed");
    }

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "members.reset_member_password",
    skip(state, ctx),
    fields(member_id = %member_id, user_id = %ctx.user.id)
)]
async fn reset_member_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ErrorResponse> {
    let target = find_member(state.pool(), member_id).await?;
    let caller = ensure_member_access(state.pool(), target.workspace_id, ctx.user.id).await?;
    if !caller.role.can_manage(target.role) {
        return Err(ErrorResponse::forbidden());
    }

    let user = UserRepository::find_by_id(state.pool(), target.user_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load member profile");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("user"))?;

    let request = ResetMemberPasswordRequest {
        user_id: user.id,
        email: user.email,
    };
    if let Err(error) = state.functions().reset_member_password(&request).await {
        tracing::error!(?error, "reset-member-password dispatch failed");
        return Ok(Json(ApiResponse::rejected(
            "failed to reset password",
            "reset_failed",
        )));
    }

    Ok(Json(ApiResponse::success(())))
}

async fn find_member(pool: &PgPool, member_id: Uuid) -> Result<WorkspaceMember, ErrorResponse> {
    let member = WorkspaceMemberRepository::find_by_id(pool, member_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %member_id, "failed to load member");
            ErrorResponse::internal()
        })?;

    member.ok_or_else(|| ErrorResponse::not_found("member"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_cannot_grant_or_revoke_admin() {
        assert!(may_assign_role(
            WorkspaceRole::Admin,
            WorkspaceRole::Member,
            WorkspaceRole::Viewer
        ));
        // Granting admin is an owner-only move.
        assert!(!may_assign_role(
            WorkspaceRole::Admin,
            WorkspaceRole::Member,
            WorkspaceRole::Admin
        ));
        // And once someone is an admin, only the owner can change them.
        assert!(!may_assign_role(
            WorkspaceRole::Admin,
            WorkspaceRole::Admin,
            WorkspaceRole::Member
        ));
    }

    #[test]
    fn owners_manage_admins_but_nobody_grants_owner() {
        assert!(may_assign_role(
            WorkspaceRole::Owner,
            WorkspaceRole::Member,
            WorkspaceRole::Admin
        ));
        assert!(may_assign_role(
            WorkspaceRole::Owner,
            WorkspaceRole::Admin,
            WorkspaceRole::Member
        ));
        assert!(!may_assign_role(
            WorkspaceRole::Owner,
            WorkspaceRole::Member,
            WorkspaceRole::Owner
        ));
    }
}
