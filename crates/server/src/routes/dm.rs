use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::{get, patch},
};
use db::dm::{DmConversation, DmMessage, DmRepository};
use serde::Deserialize;
use services::events::EventScope;
use tracing::instrument;
use uuid::Uuid;

use super::{
    chat::{PageQuery, chat_error, forward_events},
    error::ErrorResponse,
    members::ensure_member_access,
};
use crate::{AppState, auth::RequestContext};

#[derive(Debug, Deserialize)]
struct OpenConversationRequest {
    workspace_id: Uuid,
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ConversationsQuery {
    workspace_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SendDmRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct EditDmRequest {
    content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/dm/conversations",
            get(list_conversations).post(open_conversation),
        )
        .route(
            "/dm/conversations/{conversation_id}/messages",
            get(list_messages).post(send_message),
        )
        .route(
            "/dm/conversations/{conversation_id}/messages/{message_id}",
            patch(edit_message).delete(delete_message),
        )
        .route(
            "/dm/conversations/{conversation_id}/events",
            get(conversation_events),
        )
}

/// Only the two participants may touch a conversation.
async fn authorize_conversation(
    state: &AppState,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<DmConversation, ErrorResponse> {
    let conversation = DmRepository::find_conversation(state.pool(), conversation_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %conversation_id, "failed to load conversation");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("conversation"))?;

    if conversation.user_a != user_id && conversation.user_b != user_id {
        return Err(ErrorResponse::forbidden());
    }

    Ok(conversation)
}

#[instrument(
    name = "dm.list_conversations",
    skip(state, ctx, params),
    fields(workspace_id = %params.workspace_id, user_id = %ctx.user.id)
)]
async fn list_conversations(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ConversationsQuery>,
) -> Result<Json<Vec<DmConversation>>, ErrorResponse> {
    ensure_member_access(state.pool(), params.workspace_id, ctx.user.id).await?;

    let conversations =
        DmRepository::list_conversations_for_user(state.pool(), params.workspace_id, ctx.user.id)
            .await
            .map_err(|error| {
                tracing::error!(?error, "failed to list conversations");
                ErrorResponse::internal()
            })?;

    Ok(Json(conversations))
}

/// Find-or-create keyed on the ordered pair, so repeated opens return the
/// same conversation.
#[instrument(
    name = "dm.open_conversation",
    skip(state, ctx, payload),
    fields(workspace_id = %payload.workspace_id, user_id = %ctx.user.id)
)]
async fn open_conversation(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<OpenConversationRequest>,
) -> Result<Json<DmConversation>, ErrorResponse> {
    if payload.user_id == ctx.user.id {
        return Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "cannot open a conversation with yourself",
        ));
    }

    ensure_member_access(state.pool(), payload.workspace_id, ctx.user.id).await?;
    // The other party must belong to the same workspace.
    ensure_member_access(state.pool(), payload.workspace_id, payload.user_id)
        .await
        .map_err(|_| ErrorResponse::not_found("member"))?;

    let conversation = DmRepository::find_or_create_conversation(
        state.pool(),
        payload.workspace_id,
        ctx.user.id,
        payload.user_id,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to open conversation");
        ErrorResponse::internal()
    })?;

    Ok(Json(conversation))
}

#[instrument(
    name = "dm.list_messages",
    skip(state, ctx, page),
    fields(conversation_id = %conversation_id, user_id = %ctx.user.id)
)]
async fn list_messages(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(conversation_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<DmMessage>>, ErrorResponse> {
    authorize_conversation(&state, conversation_id, ctx.user.id).await?;

    let messages = state
        .chat()
        .dm_page(state.pool(), conversation_id, page.before, page.limit)
        .await
        .map_err(chat_error)?;

    Ok(Json(messages))
}

#[instrument(
    name = "dm.send_message",
    skip(state, ctx, payload),
    fields(conversation_id = %conversation_id, user_id = %ctx.user.id)
)]
async fn send_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendDmRequest>,
) -> Result<Json<DmMessage>, ErrorResponse> {
    if payload.content.trim().is_empty() {
        return Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "message content is required",
        ));
    }

    authorize_conversation(&state, conversation_id, ctx.user.id).await?;

    let message = state
        .chat()
        .send_dm_message(state.pool(), conversation_id, ctx.user.id, payload.content)
        .await
        .map_err(chat_error)?;

    Ok(Json(message))
}

#[instrument(
    name = "dm.edit_message",
    skip(state, ctx, payload),
    fields(message_id = %message_id, user_id = %ctx.user.id)
)]
async fn edit_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((conversation_id, message_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EditDmRequest>,
) -> Result<Json<DmMessage>, ErrorResponse> {
    authorize_conversation(&state, conversation_id, ctx.user.id).await?;

    let message = state
        .chat()
        .edit_dm_message(state.pool(), message_id, ctx.user.id, payload.content)
        .await
        .map_err(chat_error)?;

    Ok(Json(message))
}

#[instrument(
    name = "dm.delete_message",
    skip(state, ctx),
    fields(message_id = %message_id, user_id = %ctx.user.id)
)]
async fn delete_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((conversation_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ErrorResponse> {
    authorize_conversation(&state, conversation_id, ctx.user.id).await?;

    state
        .chat()
        .delete_dm_message(state.pool(), message_id, ctx.user.id)
        .await
        .map_err(chat_error)?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "dm.conversation_events",
    skip(state, ctx, ws),
    fields(conversation_id = %conversation_id, user_id = %ctx.user.id)
)]
async fn conversation_events(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(conversation_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, ErrorResponse> {
    authorize_conversation(&state, conversation_id, ctx.user.id).await?;

    let events = state.events().clone();
    Ok(ws.on_upgrade(move |socket| {
        forward_events(socket, events, EventScope::Conversation { conversation_id })
    }))
}
