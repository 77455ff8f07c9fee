use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, routes::error::ErrorResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Authenticated caller, inserted as a request extension by
/// [`authenticate`] and read by every route handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: AuthUser,
}

pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ErrorResponse::new(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config().jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ErrorResponse::new(StatusCode::UNAUTHORIZED, "invalid token"))?
    .claims;

    request.extensions_mut().insert(RequestContext {
        user: AuthUser { id: claims.sub },
    });

    Ok(next.run(request).await)
}
