//! Login and session lookup.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tally_core::access::{Credentials, SessionUser};
use tally_db::DbError;
use tracing::{info, warn};

use crate::auth::{verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

/// Unknown username and wrong password fail identically.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<LoginResponse>> {
    let stored = state.db.users().find_credentials(&credentials.username).await?;

    let (user_id, hash) = match stored {
        Some(found) => (Some(found.id), Some(found.password_hash)),
        None => (None, None),
    };
    let verified = verify_password(credentials.password, hash).await;

    let user_id = match (verified, user_id) {
        (true, Some(id)) => id,
        _ => {
            warn!(username = %credentials.username, "Login rejected");
            return Err(ApiError::invalid_credentials());
        }
    };

    let (user, _) = state.db.users().session_user(&user_id).await?;
    let token = state.jwt.issue(&user)?;

    info!(user = %user.username, permissions = user.permissions.len(), "Login succeeded");
    Ok(Json(LoginResponse { token, user }))
}

/// Re-reads the user and re-resolves permissions from the store.
async fn me(State(state): State<Arc<AppState>>, caller: AuthUser) -> ApiResult<Json<SessionUser>> {
    match state.db.users().session_user(&caller.id).await {
        Ok((user, _)) => Ok(Json(user)),
        Err(DbError::NotFound { .. }) => Err(ApiError::unauthorized()),
        Err(e) => Err(e.into()),
    }
}
