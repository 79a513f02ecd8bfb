//! User administration routes. Gated by `users.*`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tally_core::access::{NewUserInput, User, UserUpdateInput};

use crate::auth::{hash_password, AuthUser};
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/{id}", get(fetch).put(update).delete(remove))
}

async fn list(State(state): State<Arc<AppState>>, caller: AuthUser) -> ApiResult<Json<Vec<User>>> {
    caller.require("users.view")?;
    Ok(Json(state.db.users().list().await?))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    caller.require("users.view")?;
    Ok(Json(state.db.users().get(&id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Json(input): Json<NewUserInput>,
) -> ApiResult<(StatusCode, Json<User>)> {
    caller.require("users.create")?;
    input.validate()?;

    let hash = hash_password(input.password.clone()).await?;
    let user = state.db.users().create(&input, &hash).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Partial update. A non-empty `password` replaces the stored hash.
async fn update(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UserUpdateInput>,
) -> ApiResult<Json<User>> {
    caller.require("users.edit")?;
    input.validate()?;

    let hash = match input.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password(password.to_string()).await?),
        None => None,
    };
    let user = state.db.users().update(&id, &input, hash.as_deref()).await?;
    Ok(Json(user))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    caller.require("users.delete")?;
    state.db.users().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
