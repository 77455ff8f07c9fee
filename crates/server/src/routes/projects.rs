use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use db::{
    project_statuses::{ProjectStatus, ProjectStatusRepository},
    projects::{Project, ProjectRepository},
    types::WorkspaceRole,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{
    error::ErrorResponse,
    members::{ensure_member_access, ensure_role},
};
use crate::{AppState, auth::RequestContext};

#[derive(Debug, Serialize)]
pub struct ListProjectsResponse {
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct ProjectsQuery {
    workspace_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct CreateProjectRequest {
    workspace_id: Uuid,
    name: String,
    color: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProjectRequest {
    name: String,
    color: String,
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct CreateStatusRequest {
    name: String,
    color: String,
    position: i32,
    is_completed: bool,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    name: String,
    color: String,
    position: i32,
    is_completed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{project_id}",
            get(get_project)
                .patch(update_project)
                .delete(delete_project),
        )
        .route(
            "/projects/{project_id}/statuses",
            get(list_statuses).post(create_status),
        )
        .route(
            "/statuses/{status_id}",
            patch(update_status).delete(delete_status),
        )
        .route("/statuses/{status_id}/default", post(set_default_status))
}

/// Loads the project and checks the caller belongs to its workspace.
async fn authorize_project(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(Project, WorkspaceRole), ErrorResponse> {
    let project = ProjectRepository::find_by_id(state.pool(), project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %project_id, "failed to load project");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("project"))?;

    let member = ensure_member_access(state.pool(), project.workspace_id, user_id).await?;
    Ok((project, member.role))
}

#[instrument(
    name = "projects.list_projects",
    skip(state, ctx, params),
    fields(workspace_id = %params.workspace_id, user_id = %ctx.user.id)
)]
async fn list_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ProjectsQuery>,
) -> Result<Json<ListProjectsResponse>, ErrorResponse> {
    ensure_member_access(state.pool(), params.workspace_id, ctx.user.id).await?;

    let projects = ProjectRepository::list_by_workspace(state.pool(), params.workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, workspace_id = %params.workspace_id, "failed to list projects");
            ErrorResponse::internal()
        })?;

    Ok(Json(ListProjectsResponse { projects }))
}

#[instrument(
    name = "projects.get_project",
    skip(state, ctx),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn get_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ErrorResponse> {
    let (project, _) = authorize_project(&state, project_id, ctx.user.id).await?;
    Ok(Json(project))
}

/// Creates the project and seeds its default statuses in one transaction.
/// Plan limits answer with a soft rejection rather than an error.
#[instrument(
    name = "projects.create_project",
    skip(state, ctx, payload),
    fields(workspace_id = %payload.workspace_id, user_id = %ctx.user.id)
)]
async fn create_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<ApiResponse<Project>>, ErrorResponse> {
    ensure_role(
        state.pool(),
        payload.workspace_id,
        ctx.user.id,
        WorkspaceRole::Member,
    )
    .await?;

    let usage = state
        .subscriptions()
        .usage(state.pool(), payload.workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load plan usage");
            ErrorResponse::internal()
        })?;

    if let Some(usage) = usage
        && !usage.can_add_project()
    {
        return Ok(Json(ApiResponse::rejected(
            "project limit reached for the current plan",
            "limit_reached",
        )));
    }

    let mut tx = state.pool().begin().await.map_err(|error| {
        tracing::error!(?error, "failed to begin transaction");
        ErrorResponse::internal()
    })?;

    let project = ProjectRepository::create(
        &mut *tx,
        payload.workspace_id,
        payload.name,
        payload.color,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to create project");
        ErrorResponse::internal()
    })?;

    ProjectStatusRepository::create_default_statuses(&mut *tx, project.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, project_id = %project.id, "failed to seed default statuses");
            ErrorResponse::internal()
        })?;

    tx.commit().await.map_err(|error| {
        tracing::error!(?error, "failed to commit transaction");
        ErrorResponse::internal()
    })?;

    Ok(Json(ApiResponse::success(project)))
}

#[instrument(
    name = "projects.update_project",
    skip(state, ctx, payload),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn update_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ErrorResponse> {
    let (_, role) = authorize_project(&state, project_id, ctx.user.id).await?;
    if !role.can_mutate() {
        return Err(ErrorResponse::forbidden());
    }

    let project = ProjectRepository::update(
        state.pool(),
        project_id,
        payload.name,
        payload.color,
        payload.archived,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, %project_id, "failed to update project");
        ErrorResponse::internal()
    })?;

    Ok(Json(project))
}

#[instrument(
    name = "projects.delete_project",
    skip(state, ctx),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn delete_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    let (project, _) = authorize_project(&state, project_id, ctx.user.id).await?;
    ensure_role(
        state.pool(),
        project.workspace_id,
        ctx.user.id,
        WorkspaceRole::Admin,
    )
    .await?;

    ProjectRepository::delete(state.pool(), project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %project_id, "failed to delete project");
            ErrorResponse::internal()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "projects.list_statuses",
    skip(state, ctx),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn list_statuses(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ProjectStatus>>, ErrorResponse> {
    authorize_project(&state, project_id, ctx.user.id).await?;

    let statuses = ProjectStatusRepository::list_by_project(state.pool(), project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %project_id, "failed to list statuses");
            ErrorResponse::internal()
        })?;

    Ok(Json(statuses))
}

#[instrument(
    name = "projects.create_status",
    skip(state, ctx, payload),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn create_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateStatusRequest>,
) -> Result<Json<ProjectStatus>, ErrorResponse> {
    let (_, role) = authorize_project(&state, project_id, ctx.user.id).await?;
    if !role.can_mutate() {
        return Err(ErrorResponse::forbidden());
    }

    let status = ProjectStatusRepository::create(
        state.pool(),
        project_id,
        payload.name,
        payload.color,
        payload.position,
        payload.is_completed,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, %project_id, "failed to create status");
        ErrorResponse::internal()
    })?;

    Ok(Json(status))
}

#[instrument(
    name = "projects.update_status",
    skip(state, ctx, payload),
    fields(status_id = %status_id, user_id = %ctx.user.id)
)]
async fn update_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(status_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ProjectStatus>, ErrorResponse> {
    authorize_status(&state, status_id, ctx.user.id).await?;

    let status = ProjectStatusRepository::update(
        state.pool(),
        status_id,
        payload.name,
        payload.color,
        payload.position,
        payload.is_completed,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, %status_id, "failed to update status");
        ErrorResponse::internal()
    })?;

    Ok(Json(status))
}

#[instrument(
    name = "projects.delete_status",
    skip(state, ctx),
    fields(status_id = %status_id, user_id = %ctx.user.id)
)]
async fn delete_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(status_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    let status = authorize_status(&state, status_id, ctx.user.id).await?;
    if status.is_default {
        return Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "the default status cannot be deleted",
        ));
    }

    ProjectStatusRepository::delete(state.pool(), status_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %status_id, "failed to delete status");
            ErrorResponse::internal()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "projects.set_default_status",
    skip(state, ctx),
    fields(status_id = %status_id, user_id = %ctx.user.id)
)]
async fn set_default_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(status_id): Path<Uuid>,
) -> Result<Json<ProjectStatus>, ErrorResponse> {
    authorize_status(&state, status_id, ctx.user.id).await?;

    let mut tx = state.pool().begin().await.map_err(|error| {
        tracing::error!(?error, "failed to begin transaction");
        ErrorResponse::internal()
    })?;

    let status = ProjectStatusRepository::set_default(&mut tx, status_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %status_id, "failed to set default status");
            ErrorResponse::internal()
        })?;

    tx.commit().await.map_err(|error| {
        tracing::error!(?error, "failed to commit transaction");
        ErrorResponse::internal()
    })?;

    Ok(Json(status))
}

async fn authorize_status(
    state: &AppState,
    status_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectStatus, ErrorResponse> {
    let status = ProjectStatusRepository::find_by_id(state.pool(), status_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %status_id, "failed to load status");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("status"))?;

    let (_, role) = authorize_project(state, status.project_id, user_id).await?;
    if !role.can_mutate() {
        return Err(ErrorResponse::forbidden());
    }

    Ok(status)
}
