use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post, put},
};
use db::{
    notification_preferences::{
        NotificationPreferenceRepository, NotificationPreferences, PushSubscription,
    },
    notifications::{Notification, NotificationRepository},
};
use serde::{Deserialize, Serialize};
use services::events::EventScope;
use tracing::instrument;
use uuid::Uuid;

use super::{chat::PageQuery, error::ErrorResponse, members::ensure_member_access};
use crate::{AppState, auth::RequestContext};

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Serialize)]
struct UnreadCountResponse {
    unread: i64,
}

#[derive(Debug, Serialize)]
struct MarkAllReadResponse {
    marked: u64,
}

#[derive(Debug, Deserialize)]
struct UpdatePreferencesRequest {
    task_assigned: bool,
    task_completed: bool,
    comment_added: bool,
    chat_message: bool,
    member_joined: bool,
    payment_verified: bool,
    workspace_event: bool,
    quiet_hours_start: Option<String>,
    quiet_hours_end: Option<String>,
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct RegisterDeviceRequest {
    device_id: String,
    platform: String,
    token: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/workspaces/{workspace_id}/notifications",
            get(list_notifications),
        )
        .route(
            "/workspaces/{workspace_id}/notifications/unread",
            get(unread_count),
        )
        .route(
            "/workspaces/{workspace_id}/notifications/read-all",
            post(mark_all_read),
        )
        .route(
            "/notifications/{notification_id}/read",
            post(mark_read),
        )
        .route(
            "/notifications/{notification_id}",
            delete(delete_notification),
        )
        .route(
            "/notification-preferences",
            get(get_preferences).put(update_preferences),
        )
        .route("/push-devices", put(register_device))
        .route("/push-devices/{device_id}", delete(remove_device))
        .route(
            "/workspaces/{workspace_id}/notifications/events",
            get(notification_events),
        )
}

#[instrument(
    name = "notifications.list_notifications",
    skip(state, ctx, page),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn list_notifications(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Notification>>, ErrorResponse> {
    ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let limit = page.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 200);
    let notifications = NotificationRepository::page_desc(
        state.pool(),
        ctx.user.id,
        workspace_id,
        page.before,
        limit,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, %workspace_id, "failed to list notifications");
        ErrorResponse::internal()
    })?;

    Ok(Json(notifications))
}

#[instrument(
    name = "notifications.unread_count",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn unread_count(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<UnreadCountResponse>, ErrorResponse> {
    ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let unread = NotificationRepository::unread_count(state.pool(), ctx.user.id, workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to count unread notifications");
            ErrorResponse::internal()
        })?;

    Ok(Json(UnreadCountResponse { unread }))
}

/// Marking is scoped to the caller's own rows; marking someone else's
/// notification is a silent no-op at the SQL level.
#[instrument(
    name = "notifications.mark_read",
    skip(state, ctx),
    fields(notification_id = %notification_id, user_id = %ctx.user.id)
)]
async fn mark_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    NotificationRepository::mark_read(state.pool(), notification_id, ctx.user.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %notification_id, "failed to mark notification read");
            ErrorResponse::internal()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "notifications.mark_all_read",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn mark_all_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<MarkAllReadResponse>, ErrorResponse> {
    ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let marked = NotificationRepository::mark_all_read(state.pool(), ctx.user.id, workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to mark notifications read");
            ErrorResponse::internal()
        })?;

    Ok(Json(MarkAllReadResponse { marked }))
}

#[instrument(
    name = "notifications.delete_notification",
    skip(state, ctx),
    fields(notification_id = %notification_id, user_id = %ctx.user.id)
)]
async fn delete_notification(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    NotificationRepository::delete(state.pool(), notification_id, ctx.user.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %notification_id, "failed to delete notification");
            ErrorResponse::internal()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "notifications.get_preferences", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn get_preferences(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<NotificationPreferences>, ErrorResponse> {
    let prefs = NotificationPreferenceRepository::find(state.pool(), ctx.user.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load notification preferences");
            ErrorResponse::internal()
        })?
        .unwrap_or_else(|| NotificationPreferences::defaults(ctx.user.id));

    Ok(Json(prefs))
}

#[instrument(
    name = "notifications.update_preferences",
    skip(state, ctx, payload),
    fields(user_id = %ctx.user.id)
)]
async fn update_preferences(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<Json<NotificationPreferences>, ErrorResponse> {
    if let Some(window) = payload
        .quiet_hours_start
        .as_deref()
        .or(payload.quiet_hours_end.as_deref())
        && (payload.quiet_hours_start.is_none() || payload.quiet_hours_end.is_none())
    {
        tracing::debug!(window, "rejecting half-open quiet-hours window");
        return Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "quiet hours require both a start and an end",
        ));
    }

    let prefs = NotificationPreferences {
        user_id: ctx.user.id,
        task_assigned: payload.task_assigned,
        task_completed: payload.task_completed,
        comment_added: payload.comment_added,
        chat_message: payload.chat_message,
        member_joined: payload.member_joined,
        payment_verified: payload.payment_verified,
        workspace_event: payload.workspace_event,
        quiet_hours_start: payload.quiet_hours_start,
        quiet_hours_end: payload.quiet_hours_end,
        timezone: payload.timezone,
        updated_at: chrono::Utc::now(),
    };

    let saved = NotificationPreferenceRepository::upsert(state.pool(), &prefs)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to save notification preferences");
            ErrorResponse::internal()
        })?;

    Ok(Json(saved))
}

#[instrument(
    name = "notifications.register_device",
    skip(state, ctx, payload),
    fields(user_id = %ctx.user.id)
)]
async fn register_device(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<RegisterDeviceRequest>,
) -> Result<Json<PushSubscription>, ErrorResponse> {
    let subscription = NotificationPreferenceRepository::upsert_push_subscription(
        state.pool(),
        ctx.user.id,
        payload.device_id,
        payload.platform,
        payload.token,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to register push device");
        ErrorResponse::internal()
    })?;

    Ok(Json(subscription))
}

#[instrument(
    name = "notifications.remove_device",
    skip(state, ctx),
    fields(user_id = %ctx.user.id, device_id = %device_id)
)]
async fn remove_device(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(device_id): Path<String>,
) -> Result<StatusCode, ErrorResponse> {
    NotificationPreferenceRepository::delete_push_subscription(
        state.pool(),
        ctx.user.id,
        &device_id,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to remove push device");
        ErrorResponse::internal()
    })?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "notifications.notification_events",
    skip(state, ctx, ws),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn notification_events(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, ErrorResponse> {
    ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let events = state.events().clone();
    let scope = EventScope::Notifications {
        workspace_id,
        user_id: ctx.user.id,
    };
    Ok(ws.on_upgrade(move |socket| super::chat::forward_events(socket, events, scope)))
}
