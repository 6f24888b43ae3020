//! Notification feed handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::notifications::NotificationFilter;
use crate::db::DbNotification;
use crate::error::AppError;
use crate::http::auth::AuthUser;
use crate::services;
use crate::state::AppState;
use crate::types::NotificationCategory;

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub items: Vec<DbNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Serve the feed. Due/overdue rows are materialized lazily: each request
/// kicks off a detached evaluation pass on its own connection and serves the
/// page as it stands. Rows the pass creates show up on a later read, which is
/// the at-least-once, eventually consistent contract of the feed.
pub async fn feed(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    if let Some(category) = &query.category {
        if NotificationCategory::parse(category).is_none() {
            return Err(AppError::validation(format!(
                "Unknown notification category: {category}"
            )));
        }
    }

    // Detached; the read below does not wait for it
    let _handle = services::notifications::spawn_evaluation(
        state.db_path.clone(),
        user.id.clone(),
        Utc::now().date_naive(),
    );

    let db = state.db()?;
    let page = db.get_notifications(
        &user.id,
        &NotificationFilter {
            category: query.category,
            read: query.read,
            limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            cursor: query.cursor,
        },
    )?;
    Ok(Json(FeedResponse {
        items: page.items,
        next_cursor: page.next_cursor,
    }))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db()?;
    if !db.mark_notification_read(&user.id, &id)? {
        // Marking an already-read row again is fine; only absence is an error
        if db.get_notification(&user.id, &id)?.is_none() {
            return Err(AppError::NotFound("Notification".to_string()));
        }
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn read_all(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db()?;
    let marked = db.mark_all_notifications_read(&user.id)?;
    Ok(Json(serde_json::json!({ "success": true, "marked": marked })))
}
