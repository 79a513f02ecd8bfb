//! Purchase routes.
//!
//! Creating a purchase receives its stock. Deleting it does not give the
//! stock back, and `PUT` only touches the header.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tally_core::document::{PurchaseHeaderInput, PurchaseInput};
use tally_core::import::{parse_purchases, ImportKind};
use tally_core::PurchaseInvoice;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::{import_csv, ImportSummary};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/purchases", get(list).post(create))
        .route("/purchases/import", post(import))
        .route("/purchases/{id}", get(fetch).put(update).delete(remove))
}

async fn list(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
) -> ApiResult<Json<Vec<PurchaseInvoice>>> {
    Ok(Json(state.db.purchases().list().await?))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PurchaseInvoice>> {
    Ok(Json(state.db.purchases().get(&id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Json(input): Json<PurchaseInput>,
) -> ApiResult<(StatusCode, Json<PurchaseInvoice>)> {
    let purchase = state.db.purchases().create(input.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<PurchaseHeaderInput>,
) -> ApiResult<Json<PurchaseInvoice>> {
    let draft = input.into_draft()?;
    Ok(Json(state.db.purchases().update_header(&id, draft).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.purchases().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn import(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<ImportSummary>> {
    let db = state.db.clone();
    import_csv(&state, multipart, ImportKind::Purchases, |bytes| async move {
        let drafts = parse_purchases(bytes.as_slice(), Utc::now())?;
        Ok::<_, ApiError>(db.imports().purchases(drafts).await?)
    })
    .await
}
