//! Backup and restore routes.
//!
//! ```text
//! GET  /system/export   system.backup   snapshot ──► backups/backup-{millis}.json ──► download
//! POST /system/import   system.restore  multipart `backup` ──► validate ──► full replace
//! ```

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_db::Snapshot;
use tracing::{info, warn};

use crate::auth::{bearer_from_headers, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::upload;
use crate::AppState;

/// Lets a plain download link carry the session token.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub message: String,
    pub tables: usize,
    pub rows: usize,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/system/export", get(export))
        .route("/system/import", post(restore))
}

async fn export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_from_headers(&headers).or(query.token.as_deref());
    let caller = AuthUser::from_token(&state, token)?;
    caller.require("system.backup")?;

    let snapshot = state.db.backups().export().await?;
    let body = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| ApiError::storage("Failed to export database", e))?;

    let backup_dir = &state.config.storage.backup_dir;
    let file_name = format!("backup-{}.json", Utc::now().timestamp_millis());
    tokio::fs::create_dir_all(backup_dir)
        .await
        .map_err(|e| ApiError::storage("Failed to export database", e))?;
    let path = backup_dir.join(&file_name);
    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| ApiError::storage("Failed to export database", e))?;

    info!(user = %caller.username, path = %path.display(), bytes = body.len(), "Backup written");

    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
    ];
    Ok((headers, body))
}

/// Destructive: every table in the upload is emptied and refilled.
async fn restore(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<RestoreResponse>> {
    caller.require("system.restore")?;

    let bytes = upload::backup_file(multipart).await?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::validation(format!("Invalid backup file: {}", e)))?;

    warn!(user = %caller.username, tables = snapshot.len(), "Restoring database from backup");
    let summary = state.db.backups().restore(&snapshot).await?;

    Ok(Json(RestoreResponse {
        message: "Database successfully restored".to_string(),
        tables: summary.tables,
        rows: summary.rows,
    }))
}
