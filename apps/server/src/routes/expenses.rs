//! Expense and expense category routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tally_core::{Expense, ExpenseCategory, ExpenseCategoryInput, ExpenseInput};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/expenses", get(list).post(create))
        .route("/expenses/categories", get(list_categories).post(create_category))
        .route(
            "/expenses/categories/{id}",
            get(fetch_category).put(update_category).delete(remove_category),
        )
        .route("/expenses/{id}", get(fetch).put(update).delete(remove))
}

async fn list(State(state): State<Arc<AppState>>, _caller: AuthUser) -> ApiResult<Json<Vec<Expense>>> {
    Ok(Json(state.db.expenses().list().await?))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Expense>> {
    Ok(Json(state.db.expenses().get(&id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let draft = input.into_draft(Utc::now().date_naive())?;
    let expense = state.db.expenses().create(&draft).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<Json<Expense>> {
    let draft = input.into_draft(Utc::now().date_naive())?;
    Ok(Json(state.db.expenses().update(&id, &draft).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.expenses().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Categories
// =============================================================================

async fn list_categories(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
) -> ApiResult<Json<Vec<ExpenseCategory>>> {
    Ok(Json(state.db.expenses().list_categories().await?))
}

async fn fetch_category(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ExpenseCategory>> {
    Ok(Json(state.db.expenses().get_category(&id).await?))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Json(input): Json<ExpenseCategoryInput>,
) -> ApiResult<(StatusCode, Json<ExpenseCategory>)> {
    let category = state.db.expenses().create_category(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<ExpenseCategoryInput>,
) -> ApiResult<Json<ExpenseCategory>> {
    Ok(Json(state.db.expenses().update_category(&id, &input).await?))
}

async fn remove_category(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.expenses().delete_category(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
