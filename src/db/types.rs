//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: String,
}

/// A row from the `clients` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbClient {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub client_type: String,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `deals` table.
///
/// `current_stage`, `status`, and `closed_at` are mutated only through the
/// stage-transition service; rows are soft-deleted via `is_deleted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbDeal {
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub title: String,
    pub property_address: Option<String>,
    pub current_stage: String,
    pub status: String,
    pub deal_value: Option<f64>,
    pub commission_amount: Option<f64>,
    pub expected_close_date: Option<String>,
    pub lost_reason: Option<String>,
    pub closed_at: Option<String>,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `milestones` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMilestone {
    pub id: String,
    pub deal_id: String,
    pub title: String,
    pub status: String,
    pub scheduled_date: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

/// A row from the `tasks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTask {
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: String,
    pub status: String,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `notifications` table.
///
/// `read_at` presence means the notification has been read. `task_id` is set
/// for task-related categories and backs the evaluator's dedup lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbNotification {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub title: String,
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub metadata: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
}

/// A row from the `deal_activity` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbDealActivity {
    pub id: String,
    pub deal_id: String,
    pub user_id: String,
    pub title: String,
    pub detail: Option<String>,
    pub created_at: String,
}
