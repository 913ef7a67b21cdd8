//! Session and anti-forgery middleware
//!
//! Every action touching per-user state carries the session id in the
//! `X-Session-Id` header and the session's token in the JSON body field
//! `token`. The token is checked before identity; any failure is reported
//! uniformly as `unauthorized` and the handler never runs.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use compare_common::api::auth::{validate_session_age, validate_token, SessionAuthError};
use compare_common::db::{sessions, users, SessionRecord, UserRecord};
use compare_common::Owner;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Header carrying the session id
pub const SESSION_HEADER: &str = "x-session-id";

/// Request bodies are small JSON documents
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Verified request origin, inserted into request extensions
#[derive(Debug, Clone)]
pub struct Caller {
    pub session: SessionRecord,
    /// Bound account, `None` for anonymous sessions
    pub user: Option<UserRecord>,
}

/// Token field of an action body
#[derive(Debug, Deserialize)]
struct TokenField {
    #[serde(default)]
    token: Option<String>,
}

/// Session middleware
///
/// Buffers the body to read the token, verifies the session, then restores
/// the body for the handler and attaches the [`Caller`].
pub async fn session_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::Unauthorized(format!("Failed to read body: {}", e)))?;

    // An unreadable body cannot carry a valid token
    let token = serde_json::from_slice::<TokenField>(&body_bytes)
        .ok()
        .and_then(|t| t.token);

    let session_id = parts
        .headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok());

    let caller = verify_request(&state, session_id, token.as_deref()).await?;

    let mut request = Request::from_parts(parts, Body::from(body_bytes));
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

/// Resolve the session and check its token and age
pub async fn verify_request(
    state: &AppState,
    session_id: Option<&str>,
    token: Option<&str>,
) -> ApiResult<Caller> {
    let Some(session_id) = session_id else {
        return Err(ApiError::Unauthorized(SessionAuthError::UnknownSession.to_string()));
    };

    let Some(session) = sessions::load_session(&state.db, session_id).await? else {
        warn!("Rejected request for unknown session {}", session_id);
        return Err(ApiError::Unauthorized(SessionAuthError::UnknownSession.to_string()));
    };

    validate_token(token, &session.csrf_token).map_err(|e| {
        warn!("Token check failed for session {}: {}", session.session_id, e);
        ApiError::Unauthorized(e.to_string())
    })?;

    validate_session_age(
        session.created_at,
        Utc::now(),
        state.config.session_timeout_seconds,
    )
    .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = match &session.user_guid {
        Some(guid) => users::find_user(&state.db, guid).await?,
        None => None,
    };

    Ok(Caller { session, user })
}

/// Owner whose list the caller may act on
///
/// Accounts need a role with the "read" capability. Anonymous sessions are
/// admitted only when guest comparison is enabled.
pub fn authorize(state: &AppState, caller: &Caller) -> ApiResult<Owner> {
    match &caller.user {
        Some(user) if state.config.role_can_read(&user.role) => Ok(Owner::User(user.guid.clone())),
        Some(user) => {
            debug!("Role {} of {} lacks read capability", user.role, user.username);
            Err(ApiError::Unauthorized("Insufficient capability".to_string()))
        }
        None if state.config.allow_guest_compare => {
            Ok(Owner::Anonymous(caller.session.session_id.clone()))
        }
        None => Err(ApiError::Unauthorized("Login required".to_string())),
    }
}
