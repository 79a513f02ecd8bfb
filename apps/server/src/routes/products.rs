//! Product catalogue routes.
//!
//! Create and update take either a JSON body or a multipart form with an
//! optional `image` file.

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use tally_core::import::{parse_products, ImportKind};
use tally_core::{Product, ProductInput};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::{import_csv, ImportSummary};
use crate::upload;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    pub quantity: i64,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/import", post(import))
        .route("/products/{id}", get(fetch).put(update).delete(remove))
        .route("/products/{id}/stock", patch(set_stock))
}

async fn list(State(state): State<Arc<AppState>>, _caller: AuthUser) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list().await?))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().get(&id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    request: Request,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let input = product_input(&state, request).await?;
    let product = state.db.products().create(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
    request: Request,
) -> ApiResult<Json<Product>> {
    let input = product_input(&state, request).await?;
    Ok(Json(state.db.products().update(&id, &input).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.products().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Absolute overwrite, unlike the relative increment of purchases.
async fn set_stock(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<StockUpdate>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().set_stock(&id, body.quantity).await?))
}

async fn import(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<ImportSummary>> {
    let db = state.db.clone();
    import_csv(&state, multipart, ImportKind::Products, |bytes| async move {
        let rows = parse_products(bytes.as_slice())?;
        Ok::<_, ApiError>(db.imports().products(rows).await?)
    })
    .await
}

async fn product_input(state: &Arc<AppState>, request: Request) -> ApiResult<ProductInput> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        let storage = &state.config.storage;
        upload::product_form(multipart, &storage.uploads_dir, storage.max_image_bytes).await
    } else {
        let Json(input) = Json::<ProductInput>::from_request(request, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        Ok(input)
    }
}
