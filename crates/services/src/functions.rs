//! Client for the dispatch functions (push, email, member administration).
//! These are external request/response RPCs with JSON bodies and a
//! `{ success, error?, code? }` response convention; a response with
//! `success: false` is a soft rejection, not a transport failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FunctionError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{function} rejected: {message}")]
    Rejected { function: &'static str, message: String },
}

#[derive(Debug, Deserialize)]
pub struct FunctionResponse {
    pub success: bool,
    pub error: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PushNotificationRequest {
    pub token: String,
    pub platform: String,
    pub title: String,
    pub body: Option<String>,
    pub workspace_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PaymentNotificationRequest {
    pub workspace_id: Uuid,
    pub workspace_name: String,
    pub plan_name: String,
    pub screenshot_url: String,
}

#[derive(Debug, Serialize)]
pub struct InvitationRequest {
    pub workspace_id: Uuid,
    pub workspace_name: String,
    pub email: String,
    pub invited_by: String,
}

#[derive(Debug, Serialize)]
pub struct ResetMemberPasswordRequest {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RemoveMemberRequest {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Clone)]
pub struct FunctionsClient {
    base_url: String,
    http: reqwest::Client,
}

impl FunctionsClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    async fn invoke<B: Serialize>(
        &self,
        function: &'static str,
        body: &B,
    ) -> Result<FunctionResponse, FunctionError> {
        let url = format!("{}/{function}", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<FunctionResponse>()
            .await?;

        if !response.success {
            return Err(FunctionError::Rejected {
                function,
                message: response
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(response)
    }

    pub async fn send_push_notification(
        &self,
        request: &PushNotificationRequest,
    ) -> Result<(), FunctionError> {
        self.invoke("send-push-notification", request).await?;
        Ok(())
    }

    pub async fn send_payment_notification(
        &self,
        request: &PaymentNotificationRequest,
    ) -> Result<(), FunctionError> {
        self.invoke("send-payment-notification", request).await?;
        Ok(())
    }

    pub async fn send_invitation(
        &self,
        request: &InvitationRequest,
    ) -> Result<FunctionResponse, FunctionError> {
        self.invoke("send-invitation", request).await
    }

    pub async fn reset_member_password(
        &self,
        request: &ResetMemberPasswordRequest,
    ) -> Result<(), FunctionError> {
        self.invoke("reset-member-password", request).await?;
        Ok(())
    }

    pub async fn remove_member(&self, request: &RemoveMemberRequest) -> Result<(), FunctionError> {
        self.invoke("remove-member", request).await?;
        Ok(())
    }
}
