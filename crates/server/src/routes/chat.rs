use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::Response,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use db::{
    channel_messages::{ChannelMessage, ChannelMessageError},
    channels::{Channel, ChannelError, ChannelRepository},
    dm::DmError,
    types::WorkspaceRole,
};
use serde::Deserialize;
use services::{
    chat::ChatServiceError,
    events::{EventHub, EventScope},
};
use tracing::instrument;
use uuid::Uuid;

use super::{error::ErrorResponse, members::ensure_member_access};
use crate::{AppState, auth::RequestContext};

#[derive(Debug, Deserialize)]
struct CreateChannelRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RenameChannelRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    content: String,
    reply_to_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct EditMessageRequest {
    content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/workspaces/{workspace_id}/channels",
            get(list_channels).post(create_channel),
        )
        .route(
            "/channels/{channel_id}",
            get(get_channel).patch(rename_channel).delete(delete_channel),
        )
        .route(
            "/channels/{channel_id}/messages",
            get(list_messages).post(send_message),
        )
        .route(
            "/channels/{channel_id}/messages/{message_id}",
            patch(edit_message).delete(delete_message),
        )
        .route("/channels/{channel_id}/events", get(channel_events))
}

pub fn chat_error(error: ChatServiceError) -> ErrorResponse {
    match error {
        ChatServiceError::ChannelMessage(ChannelMessageError::NotOwned)
        | ChatServiceError::Dm(DmError::NotOwned) => ErrorResponse::forbidden(),
        other => {
            tracing::error!(error = ?other, "chat operation failed");
            ErrorResponse::internal()
        }
    }
}

async fn authorize_channel(
    state: &AppState,
    channel_id: Uuid,
    user_id: Uuid,
) -> Result<(Channel, WorkspaceRole), ErrorResponse> {
    let channel = ChannelRepository::find_by_id(state.pool(), channel_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %channel_id, "failed to load channel");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("channel"))?;

    let member = ensure_member_access(state.pool(), channel.workspace_id, user_id).await?;
    Ok((channel, member.role))
}

#[instrument(
    name = "chat.list_channels",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn list_channels(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Vec<Channel>>, ErrorResponse> {
    ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let channels = ChannelRepository::list_by_workspace(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to list channels");
            ErrorResponse::internal()
        })?;

    Ok(Json(channels))
}

#[instrument(
    name = "chat.create_channel",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn create_channel(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<CreateChannelRequest>,
) -> Result<Json<Channel>, ErrorResponse> {
    let member = ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;
    if !member.role.can_mutate() {
        return Err(ErrorResponse::forbidden());
    }

    match ChannelRepository::create(state.pool(), workspace_id, payload.name, ctx.user.id).await {
        Ok(channel) => Ok(Json(channel)),
        Err(ChannelError::NameTaken) => Err(ErrorResponse::new(
            StatusCode::CONFLICT,
            "channel name already taken",
        )),
        Err(error) => {
            tracing::error!(?error, %workspace_id, "failed to create channel");
            Err(ErrorResponse::internal())
        }
    }
}

#[instrument(
    name = "chat.get_channel",
    skip(state, ctx),
    fields(channel_id = %channel_id, user_id = %ctx.user.id)
)]
async fn get_channel(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(channel_id): Path<Uuid>,
) -> Result<Json<Channel>, ErrorResponse> {
    let (channel, _) = authorize_channel(&state, channel_id, ctx.user.id).await?;
    Ok(Json(channel))
}

#[instrument(
    name = "chat.rename_channel",
    skip(state, ctx, payload),
    fields(channel_id = %channel_id, user_id = %ctx.user.id)
)]
async fn rename_channel(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(channel_id): Path<Uuid>,
    Json(payload): Json<RenameChannelRequest>,
) -> Result<Json<Channel>, ErrorResponse> {
    let (channel, role) = authorize_channel(&state, channel_id, ctx.user.id).await?;
    if !role.at_least(WorkspaceRole::Admin) && channel.created_by != ctx.user.id {
        return Err(ErrorResponse::forbidden());
    }

    let channel = ChannelRepository::rename(state.pool(), channel_id, payload.name)
        .await
        .map_err(|error| {
            tracing::error!(?error, %channel_id, "failed to rename channel");
            ErrorResponse::internal()
        })?;

    Ok(Json(channel))
}

#[instrument(
    name = "chat.delete_channel",
    skip(state, ctx),
    fields(channel_id = %channel_id, user_id = %ctx.user.id)
)]
async fn delete_channel(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(channel_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    let (channel, role) = authorize_channel(&state, channel_id, ctx.user.id).await?;
    if !role.at_least(WorkspaceRole::Admin) && channel.created_by != ctx.user.id {
        return Err(ErrorResponse::forbidden());
    }

    ChannelRepository::delete(state.pool(), channel_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %channel_id, "failed to delete channel");
            ErrorResponse::internal()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Newest-first page; the client reverses and merges it into its thread.
#[instrument(
    name = "chat.list_messages",
    skip(state, ctx, page),
    fields(channel_id = %channel_id, user_id = %ctx.user.id)
)]
async fn list_messages(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(channel_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ChannelMessage>>, ErrorResponse> {
    authorize_channel(&state, channel_id, ctx.user.id).await?;

    let messages = state
        .chat()
        .channel_page(state.pool(), channel_id, page.before, page.limit)
        .await
        .map_err(chat_error)?;

    Ok(Json(messages))
}

#[instrument(
    name = "chat.send_message",
    skip(state, ctx, payload),
    fields(channel_id = %channel_id, user_id = %ctx.user.id)
)]
async fn send_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(channel_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<ChannelMessage>, ErrorResponse> {
    if payload.content.trim().is_empty() {
        return Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "message content is required",
        ));
    }

    let (_, role) = authorize_channel(&state, channel_id, ctx.user.id).await?;
    if !role.can_mutate() {
        return Err(ErrorResponse::forbidden());
    }

    let message = state
        .chat()
        .send_channel_message(
            state.pool(),
            channel_id,
            ctx.user.id,
            payload.content,
            payload.reply_to_id,
        )
        .await
        .map_err(chat_error)?;

    Ok(Json(message))
}

#[instrument(
    name = "chat.edit_message",
    skip(state, ctx, payload),
    fields(message_id = %message_id, user_id = %ctx.user.id)
)]
async fn edit_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((channel_id, message_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EditMessageRequest>,
) -> Result<Json<ChannelMessage>, ErrorResponse> {
    authorize_channel(&state, channel_id, ctx.user.id).await?;

    let message = state
        .chat()
        .edit_channel_message(state.pool(), message_id, ctx.user.id, payload.content)
        .await
        .map_err(chat_error)?;

    Ok(Json(message))
}

#[instrument(
    name = "chat.delete_message",
    skip(state, ctx),
    fields(message_id = %message_id, user_id = %ctx.user.id)
)]
async fn delete_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((channel_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ErrorResponse> {
    authorize_channel(&state, channel_id, ctx.user.id).await?;

    state
        .chat()
        .delete_channel_message(state.pool(), message_id, ctx.user.id)
        .await
        .map_err(chat_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Realtime stream of this channel's message changes.
#[instrument(
    name = "chat.channel_events",
    skip(state, ctx, ws),
    fields(channel_id = %channel_id, user_id = %ctx.user.id)
)]
async fn channel_events(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(channel_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, ErrorResponse> {
    authorize_channel(&state, channel_id, ctx.user.id).await?;

    let events = state.events().clone();
    Ok(ws.on_upgrade(move |socket| {
        forward_events(socket, events, EventScope::Channel { channel_id })
    }))
}

/// Forwards events matching `scope` until the client disconnects. A lagged
/// subscriber is dropped; the client reconnects and refetches.
pub async fn forward_events(mut socket: WebSocket, events: EventHub, scope: EventScope) {
    let mut rx = events.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(error) => {
                        tracing::debug!(?error, "event subscription closed");
                        break;
                    }
                };
                if event.scope != scope {
                    continue;
                }
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(error) => {
                        tracing::error!(?error, "failed to serialize change event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                // Clients only ever close or ping; any read error ends the session.
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }
}
