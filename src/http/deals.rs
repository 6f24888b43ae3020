//! Deal CRUD and stage-transition handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{DbDeal, DbDealActivity, DbMilestone};
use crate::error::AppError;
use crate::http::auth::AuthUser;
use crate::services;
use crate::state::AppState;
use crate::types::{DealStage, DealStatus, StageChangeOutcome};
use crate::util::{validate_bounded_string, validate_yyyy_mm_dd};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealInput {
    pub title: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub property_address: Option<String>,
    #[serde(default)]
    pub deal_value: Option<f64>,
    #[serde(default)]
    pub commission_amount: Option<f64>,
    #[serde(default)]
    pub expected_close_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StageInput {
    #[serde(alias = "newStage")]
    pub new_stage: String,
    #[serde(default, alias = "lostReason")]
    pub lost_reason: Option<String>,
}

/// Deal detail payload: the row plus its checklist and history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDetail {
    #[serde(flatten)]
    pub deal: DbDeal,
    pub milestones: Vec<DbMilestone>,
    pub activity: Vec<DbDealActivity>,
}

#[derive(Debug, Serialize)]
pub struct StageChangeResponse {
    pub success: bool,
    pub data: StageChangeOutcome,
}

fn validate(input: &DealInput) -> Result<String, AppError> {
    let title = validate_bounded_string(&input.title, "title", 1, 200)?;
    if let Some(date) = &input.expected_close_date {
        validate_yyyy_mm_dd(date, "expectedCloseDate")?;
    }
    if input.deal_value.is_some_and(|v| v < 0.0) {
        return Err(AppError::validation("dealValue must not be negative"));
    }
    Ok(title)
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<DbDeal>>, AppError> {
    let db = state.db()?;
    Ok(Json(db.get_deals(&user.id)?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(input): Json<DealInput>,
) -> Result<Json<DbDeal>, AppError> {
    let title = validate(&input)?;

    let now = Utc::now().to_rfc3339();
    let deal = DbDeal {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        client_id: input.client_id,
        title,
        property_address: input.property_address,
        current_stage: DealStage::Lead.as_str().to_string(),
        status: DealStatus::Active.as_str().to_string(),
        deal_value: input.deal_value,
        commission_amount: input.commission_amount,
        expected_close_date: input.expected_close_date,
        lost_reason: None,
        closed_at: None,
        is_deleted: false,
        created_at: now.clone(),
        updated_at: now,
    };
    state.db()?.upsert_deal(&deal)?;
    Ok(Json(deal))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DealDetail>, AppError> {
    let db = state.db()?;
    let deal = db
        .get_deal(&user.id, &id)?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;
    let milestones = db.get_milestones(&id)?;
    let activity = db.get_deal_activity(&id)?;
    Ok(Json(DealDetail {
        deal,
        milestones,
        activity,
    }))
}

/// Update a deal's descriptive fields. Stage, status, and close bookkeeping
/// only move through the stage endpoint.
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<DealInput>,
) -> Result<Json<DbDeal>, AppError> {
    let title = validate(&input)?;

    let db = state.db()?;
    let mut deal = db
        .get_deal(&user.id, &id)?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;

    deal.title = title;
    deal.client_id = input.client_id;
    deal.property_address = input.property_address;
    deal.deal_value = input.deal_value;
    deal.commission_amount = input.commission_amount;
    deal.expected_close_date = input.expected_close_date;
    deal.updated_at = Utc::now().to_rfc3339();
    db.upsert_deal(&deal)?;
    Ok(Json(deal))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db()?;
    if !db.soft_delete_deal(&user.id, &id)? {
        return Err(AppError::NotFound("Deal".to_string()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Mark one of a deal's checklist milestones complete. Completion is
/// one-way; an already-complete milestone is left as it was.
pub async fn complete_milestone(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((deal_id, milestone_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db()?;
    db.get_deal(&user.id, &deal_id)?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;

    let milestones = db.get_milestones(&deal_id)?;
    let milestone = milestones
        .iter()
        .find(|m| m.id == milestone_id)
        .ok_or_else(|| AppError::NotFound("Milestone".to_string()))?;

    if milestone.completed_at.is_none() {
        db.complete_milestone(&milestone_id)?;
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn change_stage(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<StageInput>,
) -> Result<Json<StageChangeResponse>, AppError> {
    let db = state.db()?;
    let outcome = services::deals::change_stage(
        &db,
        &user.id,
        &id,
        &input.new_stage,
        input.lost_reason.as_deref(),
        Utc::now().date_naive(),
    )?;
    Ok(Json(StageChangeResponse {
        success: true,
        data: outcome,
    }))
}
