use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::{Duration, Utc};
use db::{
    subscriptions::SubscriptionRepository,
    types::WorkspaceRole,
    workspace_members::WorkspaceMemberRepository,
    workspaces::{Workspace, WorkspaceRepository},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::{error::ErrorResponse, members::ensure_role};
use crate::{AppState, auth::RequestContext};

const TRIAL_DAYS: i64 = 14;

#[derive(Debug, Serialize)]
pub struct ListWorkspacesResponse {
    pub workspaces: Vec<Workspace>,
}

#[derive(Debug, Deserialize)]
struct CreateWorkspaceRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RenameWorkspaceRequest {
    name: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workspaces", get(list_workspaces).post(create_workspace))
        .route(
            "/workspaces/{workspace_id}",
            get(get_workspace)
                .patch(rename_workspace)
                .delete(delete_workspace),
        )
}

#[instrument(name = "workspaces.list_workspaces", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn list_workspaces(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ListWorkspacesResponse>, ErrorResponse> {
    let workspaces = WorkspaceRepository::list_for_user(state.pool(), ctx.user.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to list workspaces");
            ErrorResponse::internal()
        })?;

    Ok(Json(ListWorkspacesResponse { workspaces }))
}

#[instrument(
    name = "workspaces.get_workspace",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn get_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Workspace>, ErrorResponse> {
    super::members::ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let workspace = WorkspaceRepository::find_by_id(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to load workspace");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("workspace"))?;

    Ok(Json(workspace))
}

/// Creates the workspace, its owner membership, and a trial subscription on
/// the cheapest plan in one transaction.
#[instrument(name = "workspaces.create_workspace", skip(state, ctx, payload), fields(user_id = %ctx.user.id))]
async fn create_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> Result<Json<Workspace>, ErrorResponse> {
    if payload.name.trim().is_empty() {
        return Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "workspace name is required",
        ));
    }

    let mut tx = state.pool().begin().await.map_err(|error| {
        tracing::error!(?error, "failed to begin transaction");
        ErrorResponse::internal()
    })?;

    let workspace = WorkspaceRepository::create(&mut *tx, payload.name, ctx.user.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to create workspace");
            ErrorResponse::internal()
        })?;

    WorkspaceMemberRepository::add(&mut *tx, workspace.id, ctx.user.id, WorkspaceRole::Owner)
        .await
        .map_err(|error| {
            tracing::error!(?error, workspace_id = %workspace.id, "failed to add owner membership");
            ErrorResponse::internal()
        })?;

    let plans = SubscriptionRepository::list_plans(&mut *tx).await.map_err(|error| {
        tracing::error!(?error, "failed to list plans");
        ErrorResponse::internal()
    })?;

    if let Some(plan) = plans.first() {
        SubscriptionRepository::start_trial(
            &mut *tx,
            workspace.id,
            plan.id,
            Utc::now() + Duration::days(TRIAL_DAYS),
        )
        .await
        .map_err(|error| {
            tracing::error!(?error, workspace_id = %workspace.id, "failed to start trial");
            ErrorResponse::internal()
        })?;
    }

    tx.commit().await.map_err(|error| {
        tracing::error!(?error, "failed to commit transaction");
        ErrorResponse::internal()
    })?;

    Ok(Json(workspace))
}

#[instrument(
    name = "workspaces.rename_workspace",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn rename_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<RenameWorkspaceRequest>,
) -> Result<Json<Workspace>, ErrorResponse> {
    ensure_role(state.pool(), workspace_id, ctx.user.id, WorkspaceRole::Admin).await?;

    let workspace = WorkspaceRepository::rename(state.pool(), workspace_id, payload.name)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to rename workspace");
            ErrorResponse::internal()
        })?;

    Ok(Json(workspace))
}

#[instrument(
    name = "workspaces.delete_workspace",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn delete_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    ensure_role(state.pool(), workspace_id, ctx.user.id, WorkspaceRole::Owner).await?;

    WorkspaceRepository::delete(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to delete workspace");
            ErrorResponse::internal()
        })?;

    Ok(StatusCode::NO_CONTENT)
}
