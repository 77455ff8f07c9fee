use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use db::{
    activity_logs::ActivityLogRepository,
    projects::ProjectRepository,
    tasks::{CreateTask, Task, TaskRepository, UpdateTask},
    types::{ActivityAction, NotificationKind, NotificationTarget, WorkspaceRole},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::{error::ErrorResponse, members::ensure_member_access};
use crate::{AppState, auth::RequestContext};

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    status_id: Uuid,
    #[serde(flatten)]
    task: CreateTask,
}

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SetPositionRequest {
    position: f64,
}

#[derive(Debug, Deserialize)]
struct SetTimerRequest {
    running: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/tasks",
            get(list_tasks).post(create_task),
        )
        .route(
            "/tasks/{task_id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/{task_id}/status", post(set_task_status))
        .route("/tasks/{task_id}/position", post(set_task_position))
        .route("/tasks/{task_id}/timer", post(set_task_timer))
}

/// Resolves a task's workspace and checks the caller's membership there.
async fn authorize_task(
    state: &AppState,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<(Task, Uuid, WorkspaceRole), ErrorResponse> {
    let task = TaskRepository::find_by_id(state.pool(), task_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to load task");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("task"))?;

    let workspace_id = TaskRepository::workspace_id(state.pool(), task_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to resolve task workspace");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("task"))?;

    let member = ensure_member_access(state.pool(), workspace_id, user_id).await?;
    if !member.role.can_mutate() {
        return Err(ErrorResponse::forbidden());
    }

    Ok((task, workspace_id, member.role))
}

#[instrument(
    name = "tasks.list_tasks",
    skip(state, ctx),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn list_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ErrorResponse> {
    let project = ProjectRepository::find_by_id(state.pool(), project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %project_id, "failed to load project");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("project"))?;

    ensure_member_access(state.pool(), project.workspace_id, ctx.user.id).await?;

    let tasks = TaskRepository::list_by_project(state.pool(), project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %project_id, "failed to list tasks");
            ErrorResponse::internal()
        })?;

    Ok(Json(tasks))
}

#[instrument(
    name = "tasks.get_task",
    skip(state, ctx),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn get_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, ErrorResponse> {
    let task = TaskRepository::find_by_id(state.pool(), task_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to load task");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("task"))?;

    let workspace_id = TaskRepository::workspace_id(state.pool(), task_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to resolve task workspace");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("task"))?;
    ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    Ok(Json(task))
}

#[instrument(
    name = "tasks.create_task",
    skip(state, ctx, payload),
    fields(project_id = %project_id, user_id = %ctx.user.id)
)]
async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<Task>, ErrorResponse> {
    let project = ProjectRepository::find_by_id(state.pool(), project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %project_id, "failed to load project");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("project"))?;

    let member = ensure_member_access(state.pool(), project.workspace_id, ctx.user.id).await?;
    if !member.role.can_mutate() {
        return Err(ErrorResponse::forbidden());
    }

    let task = TaskRepository::create(
        state.pool(),
        project_id,
        payload.status_id,
        ctx.user.id,
        &payload.task,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, %project_id, "failed to create task");
        ErrorResponse::internal()
    })?;

    record_activity(
        &state,
        project.workspace_id,
        Some(project_id),
        ctx.user.id,
        ActivityAction::Created,
        task.id,
        Some(task.title.clone()),
    )
    .await;

    notify_assignee(&state, &task, project.workspace_id, ctx.user.id).await;

    Ok(Json(task))
}

#[instrument(
    name = "tasks.update_task",
    skip(state, ctx, payload),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn update_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTask>,
) -> Result<Json<Task>, ErrorResponse> {
    let (before, workspace_id, _) = authorize_task(&state, task_id, ctx.user.id).await?;

    let task = TaskRepository::update(state.pool(), task_id, &payload)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to update task");
            ErrorResponse::internal()
        })?;

    record_activity(
        &state,
        workspace_id,
        Some(task.project_id),
        ctx.user.id,
        ActivityAction::Updated,
        task.id,
        Some(task.title.clone()),
    )
    .await;

    // Only a newly assigned user gets the assignment notification.
    if task.assignee_id != before.assignee_id {
        notify_assignee(&state, &task, workspace_id, ctx.user.id).await;
    }

    Ok(Json(task))
}

#[instrument(
    name = "tasks.set_task_status",
    skip(state, ctx, payload),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn set_task_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<Task>, ErrorResponse> {
    let (before, workspace_id, _) = authorize_task(&state, task_id, ctx.user.id).await?;

    let task = TaskRepository::set_status(state.pool(), task_id, payload.status_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to move task");
            ErrorResponse::internal()
        })?;

    let newly_completed = task.is_completed() && !before.is_completed();
    record_activity(
        &state,
        workspace_id,
        Some(task.project_id),
        ctx.user.id,
        if newly_completed {
            ActivityAction::Completed
        } else {
            ActivityAction::Updated
        },
        task.id,
        Some(task.title.clone()),
    )
    .await;

    if newly_completed
        && let Some(creator) = Some(task.created_by).filter(|&id| id != ctx.user.id)
    {
        let result = state
            .notifications()
            .notify(
                state.pool(),
                creator,
                workspace_id,
                NotificationKind::TaskCompleted,
                format!("\"{}\" was completed", task.title),
                None,
                NotificationTarget::Task,
                task.id,
            )
            .await;
        if let Err(error) = result {
            tracing::error!(?error, task_id = %task.id, "failed to record completion notification");
        }
    }

    Ok(Json(task))
}

#[instrument(
    name = "tasks.set_task_position",
    skip(state, ctx, payload),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn set_task_position(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<SetPositionRequest>,
) -> Result<Json<Task>, ErrorResponse> {
    authorize_task(&state, task_id, ctx.user.id).await?;

    let task = TaskRepository::set_position(state.pool(), task_id, payload.position)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to reposition task");
            ErrorResponse::internal()
        })?;

    Ok(Json(task))
}

/// Starts or stops the task timer. Starting an already running timer and
/// stopping a stopped one are both no-ops at the row level.
#[instrument(
    name = "tasks.set_task_timer",
    skip(state, ctx, payload),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn set_task_timer(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<SetTimerRequest>,
) -> Result<Json<Task>, ErrorResponse> {
    let (before, _, _) = authorize_task(&state, task_id, ctx.user.id).await?;

    let timer_started_at = if payload.running {
        Some(before.timer_started_at.unwrap_or_else(Utc::now))
    } else {
        None
    };

    let task = TaskRepository::set_timer(state.pool(), task_id, timer_started_at)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to update task timer");
            ErrorResponse::internal()
        })?;

    Ok(Json(task))
}

#[instrument(
    name = "tasks.delete_task",
    skip(state, ctx),
    fields(task_id = %task_id, user_id = %ctx.user.id)
)]
async fn delete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    let (task, workspace_id, _) = authorize_task(&state, task_id, ctx.user.id).await?;

    TaskRepository::delete(state.pool(), task_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %task_id, "failed to delete task");
            ErrorResponse::internal()
        })?;

    record_activity(
        &state,
        workspace_id,
        Some(task.project_id),
        ctx.user.id,
        ActivityAction::Deleted,
        task.id,
        Some(task.title),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Activity records are best-effort; a failed log entry never fails the
/// mutation it describes.
async fn record_activity(
    state: &AppState,
    workspace_id: Uuid,
    project_id: Option<Uuid>,
    actor_id: Uuid,
    action: ActivityAction,
    task_id: Uuid,
    detail: Option<String>,
) {
    let result = ActivityLogRepository::record(
        state.pool(),
        workspace_id,
        project_id,
        actor_id,
        action,
        NotificationTarget::Task,
        task_id,
        detail,
    )
    .await;
    if let Err(error) = result {
        tracing::warn!(?error, %task_id, "failed to record task activity");
    }
}

/// Notifies the assignee, unless they assigned the task to themselves.
async fn notify_assignee(state: &AppState, task: &Task, workspace_id: Uuid, actor_id: Uuid) {
    let Some(assignee_id) = task.assignee_id else {
        return;
    };
    if assignee_id == actor_id {
        return;
    }

    let result = state
        .notifications()
        .notify(
            state.pool(),
            assignee_id,
            workspace_id,
            NotificationKind::TaskAssigned,
            format!("You were assigned \"{}\"", task.title),
            None,
            NotificationTarget::Task,
            task.id,
        )
        .await;
    if let Err(error) = result {
        tracing::error!(?error, task_id = %task.id, "failed to record assignment notification");
    }
}
