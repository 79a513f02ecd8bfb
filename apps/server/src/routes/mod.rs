//! # HTTP Routes
//!
//! One module per resource. Every module exposes `router()`; they are
//! merged here and nested under the configured API root.
//!
//! ## Access
//! ```text
//! /health                         public
//! /auth/login                     public
//! /auth/me                        logged in
//! /products /customers /suppliers
//! /expenses /invoices /purchases  logged in
//! /users /roles                   users.* / roles.*
//! /system/export /system/import   system.backup / system.restore
//! ```

pub mod auth;
pub mod customers;
pub mod expenses;
pub mod health;
pub mod invoices;
pub mod products;
pub mod purchases;
pub mod roles;
pub mod suppliers;
pub mod system;
pub mod users;

use std::future::Future;
use std::sync::Arc;

use axum::extract::Multipart;
use axum::{Json, Router};
use serde::Serialize;
use tally_core::import::ImportKind;

use crate::error::ApiResult;
use crate::upload;
use crate::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(products::router())
        .merge(customers::router())
        .merge(suppliers::router())
        .merge(expenses::router())
        .merge(invoices::router())
        .merge(purchases::router())
        .merge(users::router())
        .merge(roles::router())
        .merge(system::router())
}

/// Response of the CSV import routes.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub message: String,
}

/// Stages the uploaded CSV, hands its bytes to `commit`, and settles the
/// staged file according to the outcome.
pub(crate) async fn import_csv<F, Fut>(
    state: &AppState,
    multipart: Multipart,
    kind: ImportKind,
    commit: F,
) -> ApiResult<Json<ImportSummary>>
where
    F: FnOnce(Vec<u8>) -> Fut,
    Fut: Future<Output = ApiResult<usize>>,
{
    let staged = upload::stage_csv(multipart, &state.config.storage.uploads_dir).await?;

    let result = match staged.read().await {
        Ok(bytes) => commit(bytes).await,
        Err(e) => Err(e),
    };
    staged.settle(result.is_ok()).await;

    let imported = result?;
    Ok(Json(ImportSummary {
        imported,
        message: format!("Successfully imported {} {}", imported, kind),
    }))
}
