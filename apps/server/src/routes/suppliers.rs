//! Supplier routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tally_core::{Supplier, SupplierInput};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/suppliers", get(list).post(create))
        .route("/suppliers/{id}", get(fetch).put(update).delete(remove))
}

async fn list(State(state): State<Arc<AppState>>, _caller: AuthUser) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(state.db.suppliers().list().await?))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(state.db.suppliers().get(&id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Json(input): Json<SupplierInput>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = state.db.suppliers().create(&input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<SupplierInput>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(state.db.suppliers().update(&id, &input).await?))
}

/// Fails with 409 while purchases still reference the supplier.
async fn remove(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.suppliers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
