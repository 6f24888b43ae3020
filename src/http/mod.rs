//! HTTP surface: route table and handlers.
//!
//! Everything under `/api` except `/api/health` requires a session (see
//! [`auth::AuthUser`]). Handlers stay thin: parse, authenticate, delegate to
//! the services layer, serialize.

use std::sync::Arc;

use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::state::AppState;

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod deals;
pub mod notifications;
pub mod tasks;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/clients", get(clients::list).post(clients::create))
        .route(
            "/api/clients/:id",
            get(clients::get_one)
                .put(clients::update)
                .delete(clients::remove),
        )
        .route("/api/deals", get(deals::list).post(deals::create))
        .route(
            "/api/deals/:id",
            get(deals::get_one).put(deals::update).delete(deals::remove),
        )
        .route("/api/deals/:id/stage", patch(deals::change_stage))
        .route(
            "/api/deals/:id/milestones/:milestoneId/complete",
            patch(deals::complete_milestone),
        )
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/:id", get(tasks::get_one))
        .route("/api/tasks/:id/status", patch(tasks::set_status))
        .route("/api/notifications", get(notifications::feed))
        .route(
            "/api/notifications/read-all",
            patch(notifications::read_all),
        )
        .route(
            "/api/notifications/:id/read",
            patch(notifications::mark_read),
        )
        .route("/api/dashboard", get(dashboard::stats))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
