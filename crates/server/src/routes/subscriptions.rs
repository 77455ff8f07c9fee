use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use db::{
    subscriptions::{
        SubscriptionError, SubscriptionPlan, SubscriptionRepository, SubscriptionWithPlan,
        WorkspaceSubscription,
    },
    types::{NotificationKind, NotificationTarget, WorkspaceRole},
    workspaces::WorkspaceRepository,
};
use serde::{Deserialize, Serialize};
use services::{
    functions::PaymentNotificationRequest,
    subscriptions::{AccessState, PlanUsage, access_state},
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    error::ErrorResponse,
    members::{ensure_member_access, ensure_role},
};
use crate::{AppState, auth::RequestContext};

/// Days of service one verified payment buys.
const PERIOD_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
struct SubscriptionStateResponse {
    subscription: SubscriptionWithPlan,
    access: AccessState,
    usage: Option<PlanUsage>,
}

#[derive(Debug, Deserialize)]
struct SubmitPaymentRequest {
    plan_id: Uuid,
    screenshot_url: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route(
            "/workspaces/{workspace_id}/subscription",
            get(get_subscription),
        )
        .route(
            "/workspaces/{workspace_id}/subscription/payment",
            post(submit_payment),
        )
        .route(
            "/workspaces/{workspace_id}/subscription/verify",
            post(verify_payment),
        )
}

#[instrument(name = "subscriptions.list_plans", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn list_plans(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<SubscriptionPlan>>, ErrorResponse> {
    let plans = SubscriptionRepository::list_plans(state.pool())
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to list plans");
            ErrorResponse::internal()
        })?;

    Ok(Json(plans))
}

/// Subscription state plus derived access and usage. Billing detail is
/// owner-facing; other members still need the access state to know whether
/// the workspace is writable.
#[instrument(
    name = "subscriptions.get_subscription",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn get_subscription(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<SubscriptionStateResponse>, ErrorResponse> {
    let member = ensure_member_access(state.pool(), workspace_id, ctx.user.id).await?;

    let subscription = SubscriptionRepository::current_for_workspace(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to load subscription");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("subscription"))?;

    let access = access_state(&subscription, Utc::now());

    let usage = if member.role.at_least(WorkspaceRole::Admin) {
        state
            .subscriptions()
            .usage(state.pool(), workspace_id)
            .await
            .map_err(|error| {
                tracing::error!(?error, %workspace_id, "failed to load plan usage");
                ErrorResponse::internal()
            })?
    } else {
        None
    };

    Ok(Json(SubscriptionStateResponse {
        subscription,
        access,
        usage,
    }))
}

/// Records the payment screenshot and notifies the billing reviewers. The
/// subscription stays in its current status until verification.
#[instrument(
    name = "subscriptions.submit_payment",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn submit_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<SubmitPaymentRequest>,
) -> Result<Json<WorkspaceSubscription>, ErrorResponse> {
    ensure_role(state.pool(), workspace_id, ctx.user.id, WorkspaceRole::Owner).await?;

    if payload.screenshot_url.trim().is_empty() {
        return Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "payment screenshot is required",
        ));
    }

    let subscription = match SubscriptionRepository::submit_payment(
        state.pool(),
        workspace_id,
        payload.plan_id,
        payload.screenshot_url.clone(),
    )
    .await
    {
        Ok(subscription) => subscription,
        Err(SubscriptionError::NoSubscription) => {
            return Err(ErrorResponse::not_found("subscription"));
        }
        Err(error) => {
            tracing::error!(?error, %workspace_id, "failed to submit payment");
            return Err(ErrorResponse::internal());
        }
    };

    let workspace = WorkspaceRepository::find_by_id(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to load workspace");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("workspace"))?;

    let plan_name = SubscriptionRepository::list_plans(state.pool())
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to list plans");
            ErrorResponse::internal()
        })?
        .into_iter()
        .find(|plan| plan.id == payload.plan_id)
        .map(|plan| plan.name)
        .unwrap_or_default();

    // Reviewer notification is best-effort; the submission is already saved.
    let request = PaymentNotificationRequest {
        workspace_id,
        workspace_name: workspace.name,
        plan_name,
        screenshot_url: payload.screenshot_url,
    };
    if let Err(error) = state.functions().send_payment_notification(&request).await {
        tracing::warn!(?error, %workspace_id, "payment notification dispatch failed");
    }

    Ok(Json(subscription))
}

/// Marks the submitted payment as verified, starting a new paid period, and
/// tells the workspace owner.
#[instrument(
    name = "subscriptions.verify_payment",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn verify_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<WorkspaceSubscription>, ErrorResponse> {
    ensure_role(state.pool(), workspace_id, ctx.user.id, WorkspaceRole::Owner).await?;

    let subscription = match SubscriptionRepository::verify_payment(
        state.pool(),
        workspace_id,
        ctx.user.id,
        Utc::now() + Duration::days(PERIOD_DAYS),
    )
    .await
    {
        Ok(subscription) => subscription,
        Err(SubscriptionError::NoSubscription) => {
            return Err(ErrorResponse::not_found("subscription"));
        }
        Err(error) => {
            tracing::error!(?error, %workspace_id, "failed to verify payment");
            return Err(ErrorResponse::internal());
        }
    };

    let workspace = WorkspaceRepository::find_by_id(state.pool(), workspace_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %workspace_id, "failed to load workspace");
            ErrorResponse::internal()
        })?
        .ok_or_else(|| ErrorResponse::not_found("workspace"))?;

    let result = state
        .notifications()
        .notify(
            state.pool(),
            workspace.owner_user_id,
            workspace_id,
            NotificationKind::PaymentVerified,
            "Your payment was verified".to_string(),
            None,
            NotificationTarget::Workspace,
            workspace_id,
        )
        .await;
    if let Err(error) = result {
        tracing::error!(?error, %workspace_id, "failed to record verification notification");
    }

    Ok(Json(subscription))
}
