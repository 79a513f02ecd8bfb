//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    let status = if state.db.health_check().await {
        "ok"
    } else {
        tracing::warn!("Health check failed");
        "degraded"
    };

    Json(Health {
        status,
        timestamp: Utc::now(),
    })
}
