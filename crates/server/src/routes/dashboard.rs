use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    routing::get,
};
use services::dashboard::{DashboardSnapshot, DashboardStats};
use tracing::instrument;
use uuid::Uuid;

use super::{error::ErrorResponse, members::ensure_member_access};
use crate::{AppState, auth::RequestContext};

pub fn router() -> Router<AppState> {
    Router::new().route("/workspaces/{workspace_id}/dashboard", get(get_dashboard))
}

/// One snapshot, one pure fold. Role-gated sections (performers, workload,
/// subscription usage) come back as `None` for viewers who cannot see them.
#[instrument(
    name = "dashboard.get_dashboard",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn get_dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<DashboardStats>, ErrorResponse> {
    let member = ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let snapshot = DashboardSnapshot::load(state.pool(), workspace_id, ctx.user.id, member.role)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to load dashboard snapshot");
            ErrorResponse::internal()
        })?;

    Ok(Json(DashboardStats::compute(&snapshot)))
}
