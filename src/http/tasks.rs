//! Task handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::DbTask;
use crate::error::AppError;
use crate::http::auth::AuthUser;
use crate::services;
use crate::services::tasks::TaskInput;
use crate::state::AppState;
use crate::types::TaskStatus;

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub status: Option<String>,
    /// When true, restrict to open tasks whose due date has passed.
    #[serde(default)]
    pub overdue: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: String,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<DbTask>>, AppError> {
    if let Some(status) = &query.status {
        if TaskStatus::parse(status).is_none() {
            return Err(AppError::validation(format!("Unknown task status: {status}")));
        }
    }
    let db = state.db()?;
    let mut tasks = db.get_tasks(&user.id, query.status.as_deref())?;
    if query.overdue == Some(true) {
        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        tasks.retain(|t| {
            t.status != "closed" && t.due_date.as_deref().is_some_and(|d| d < today.as_str())
        });
    }
    Ok(Json(tasks))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(input): Json<TaskInput>,
) -> Result<Json<DbTask>, AppError> {
    let db = state.db()?;
    let task = services::tasks::create_task(&db, &user.id, &input)?;
    Ok(Json(task))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DbTask>, AppError> {
    let db = state.db()?;
    db.get_task(&user.id, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Task".to_string()))
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<StatusInput>,
) -> Result<Json<DbTask>, AppError> {
    let db = state.db()?;
    let task = services::tasks::set_status(&db, &user.id, &id, &input.status)?;
    Ok(Json(task))
}
