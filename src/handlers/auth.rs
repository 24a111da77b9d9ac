//! Authentication HTTP handlers
//!
//! Endpoints for wallet challenge/response authentication. Malformed JSON
//! bodies are rejected as `VALIDATION_ERROR`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::AuthenticatedUser;
use crate::auth::AuthEngine;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AttachData, AuthMethod, ChallengeRequest, ChallengeResponse, LoginData, LoginOutcome,
    RefreshTokenRequest, UserView,
};
use crate::state::AppState;
use std::sync::Arc;

fn engine_for(state: &AppState, method: &str) -> ApiResult<Arc<dyn AuthEngine>> {
    let method: AuthMethod = method.parse().map_err(ApiError::NotFound)?;
    Ok(state.engines.engine(method))
}

/// POST /auth/:method/challenge - Issue a message for the wallet to sign
pub async fn request_challenge(
    State(state): State<AppState>,
    Path(method): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<ChallengeRequest>, ApiError>,
) -> ApiResult<Json<ChallengeResponse>> {
    req.validate()?;

    let message = engine_for(&state, &method)?
        .generate_challenge(&req.public_key)
        .await?;

    Ok(Json(ChallengeResponse { message }))
}

/// POST /auth/:method/login - Verify the signed challenge and issue tokens
pub async fn login(
    State(state): State<AppState>,
    Path(method): Path<String>,
    WithRejection(Json(data), _): WithRejection<Json<LoginData>, ApiError>,
) -> ApiResult<Json<LoginOutcome>> {
    let outcome = engine_for(&state, &method)?.login(data).await?;
    Ok(Json(outcome))
}

/// POST /auth/:method/attach - Add a wallet to the authenticated account
pub async fn attach(
    State(state): State<AppState>,
    Path(method): Path<String>,
    user: AuthenticatedUser,
    WithRejection(Json(data), _): WithRejection<Json<AttachData>, ApiError>,
) -> ApiResult<Json<LoginOutcome>> {
    let outcome = engine_for(&state, &method)?
        .attach(user.user_id, data)
        .await?;

    Ok(Json(outcome))
}

/// POST /auth/:method/unattach - Remove this method from the authenticated account
pub async fn unattach(
    State(state): State<AppState>,
    Path(method): Path<String>,
    user: AuthenticatedUser,
) -> ApiResult<StatusCode> {
    engine_for(&state, &method)?.unattach(user.user_id).await?;

    tracing::info!(user_id = %user.user_id, method = %method, "Auth method unattached");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>) -> ApiResult<StatusCode> {
    for engine in state.engines.all() {
        engine.logout().await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/refresh - Exchange a refresh token for a new pair
pub async fn refresh_token(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RefreshTokenRequest>, ApiError>,
) -> ApiResult<Json<LoginOutcome>> {
    let outcome = state.tokens.refresh(&req.refresh_token).await?;
    Ok(Json(outcome))
}

/// GET /auth/me - Current user
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<UserView>> {
    let found = state
        .users
        .find_by_id(user.user_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(found.into()))
}
