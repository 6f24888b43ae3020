//! Dashboard handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::error::AppError;
use crate::http::auth::AuthUser;
use crate::services;
use crate::state::AppState;
use crate::types::DashboardStats;

pub async fn stats(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<DashboardStats>, AppError> {
    let db = state.db()?;
    let stats = services::dashboard::stats(&db, &user.id, Utc::now().date_naive())?;
    Ok(Json(stats))
}
