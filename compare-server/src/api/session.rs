//! Session lifecycle endpoints
//!
//! Sessions start anonymous. Login binds an account and folds the anonymous
//! comparison list into it; logout unbinds and drops whatever the anonymous
//! side still holds.

use axum::{body::Bytes, extract::State, Extension, Json};
use compare_common::db::{sessions, users, UserRecord};
use compare_common::{MergeReport, Owner};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserRecord,
    pub merged: MergeReport,
}

/// POST /api/session
///
/// Does NOT require a session.
pub async fn create_session(State(state): State<AppState>) -> ApiResult<Json<SessionResponse>> {
    let session = sessions::create_session(&state.db).await?;
    info!("Started session {}", session.session_id);

    Ok(Json(SessionResponse {
        session_id: session.session_id,
        token: session.csrf_token,
    }))
}

/// POST /api/session/login
pub async fn login(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> ApiResult<Json<LoginResponse>> {
    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::Unauthorized("Malformed login request".to_string()))?;

    let Some(user) = users::verify_credentials(&state.db, &request.username, &request.password).await?
    else {
        warn!("Failed login for {:?}", request.username);
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    if !state.config.role_can_read(&user.role) {
        warn!("Login refused for {}: role {} lacks read capability", user.username, user.role);
        return Err(ApiError::Unauthorized("Insufficient capability".to_string()));
    }

    let session_id = caller.session.session_id;
    sessions::bind_user(&state.db, &session_id, &user.guid).await?;

    let merged = state
        .bridge
        .merge(
            &Owner::Anonymous(session_id.clone()),
            &Owner::User(user.guid.clone()),
        )
        .await?;

    info!("User {} logged in on session {}", user.username, session_id);

    Ok(Json(LoginResponse { user, merged }))
}

/// POST /api/session/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Value>> {
    let session_id = caller.session.session_id;

    sessions::unbind_user(&state.db, &session_id).await?;
    state.store.clear(&Owner::Anonymous(session_id.clone())).await?;

    if let Some(user) = caller.user {
        info!("User {} logged out of session {}", user.username, session_id);
    }

    Ok(Json(json!({ "status": "ok" })))
}
