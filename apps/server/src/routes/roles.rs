//! Role administration routes. Gated by `roles.*`.
//!
//! `PUT /roles/{id}` replaces the name, description and the whole
//! permission set in one transaction.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tally_core::access::{Permission, Role, RoleInput};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/roles", get(list).post(create))
        .route("/roles/permissions", get(permissions))
        .route("/roles/{id}", get(fetch).put(update).delete(remove))
}

async fn list(State(state): State<Arc<AppState>>, caller: AuthUser) -> ApiResult<Json<Vec<Role>>> {
    caller.require("roles.view")?;
    Ok(Json(state.db.roles().list().await?))
}

/// The permission catalogue.
async fn permissions(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> ApiResult<Json<Vec<Permission>>> {
    caller.require("roles.view")?;
    Ok(Json(state.db.roles().list_permissions().await?))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Role>> {
    caller.require("roles.view")?;
    Ok(Json(state.db.roles().get(&id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Json(input): Json<RoleInput>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    caller.require("roles.create")?;
    let role = state.db.roles().create(&input).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<RoleInput>,
) -> ApiResult<Json<Role>> {
    caller.require("roles.edit")?;
    Ok(Json(state.db.roles().update(&id, &input).await?))
}

/// Users holding the role are left without one.
async fn remove(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    caller.require("roles.delete")?;
    state.db.roles().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
