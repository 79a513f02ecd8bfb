//! Customer routes.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tally_core::import::{parse_customers, ImportKind};
use tally_core::{Customer, CustomerDetail, CustomerInput, CustomerSummary};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::{import_csv, ImportSummary};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", get(list).post(create))
        .route("/customers/import", post(import))
        .route("/customers/{id}", get(fetch).put(update).delete(remove))
}

/// Every customer with invoice count and total spent.
async fn list(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
) -> ApiResult<Json<Vec<CustomerSummary>>> {
    Ok(Json(state.db.customers().list().await?))
}

/// One customer with its invoices, newest first.
async fn fetch(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<CustomerDetail>> {
    Ok(Json(state.db.customers().detail(&id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Json(input): Json<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.db.customers().create(&input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.db.customers().update(&id, &input).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.customers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn import(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<ImportSummary>> {
    let db = state.db.clone();
    import_csv(&state, multipart, ImportKind::Customers, |bytes| async move {
        let rows = parse_customers(bytes.as_slice())?;
        Ok::<_, ApiError>(db.imports().customers(rows).await?)
    })
    .await
}
