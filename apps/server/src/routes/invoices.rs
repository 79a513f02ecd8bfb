//! Invoice and quotation routes.
//!
//! Create and update never touch stock. `POST /invoices/{id}/pay` is the
//! one sale path that decrements it.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tally_core::document::InvoiceInput;
use tally_core::{Invoice, InvoiceType};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub kind: Option<InvoiceType>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/invoices", get(list).post(create))
        .route("/invoices/{id}", get(fetch).put(update).delete(remove))
        .route("/invoices/{id}/pay", post(pay))
        .route("/invoices/{id}/convert", post(convert))
}

/// `?type=quotation` or `?type=invoice` narrows the list.
async fn list(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.db.invoices().list(query.kind).await?))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.db.invoices().get(&id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Json(input): Json<InvoiceInput>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = state.db.invoices().create(input.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<InvoiceInput>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.db.invoices().update(&id, input.into_draft()?).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.invoices().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn pay(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    let allow_negative = state.config.inventory.allow_negative_stock;
    Ok(Json(state.db.invoices().pay(&id, allow_negative).await?))
}

async fn convert(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.db.invoices().convert(&id).await?))
}
