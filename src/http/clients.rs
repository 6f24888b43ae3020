//! Client (contact) CRUD handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::DbClient;
use crate::error::AppError;
use crate::http::auth::AuthUser;
use crate::state::AppState;
use crate::util::{validate_bounded_string, validate_enum_string};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub client_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate(input: &ClientInput) -> Result<(String, String), AppError> {
    let name = validate_bounded_string(&input.name, "name", 1, 200)?;
    let client_type = input.client_type.as_deref().unwrap_or("buyer");
    validate_enum_string(client_type, "clientType", &["buyer", "seller", "both"])?;
    Ok((name, client_type.to_string()))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<DbClient>>, AppError> {
    let db = state.db()?;
    Ok(Json(db.get_clients(&user.id)?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(input): Json<ClientInput>,
) -> Result<Json<DbClient>, AppError> {
    let (name, client_type) = validate(&input)?;

    let now = Utc::now().to_rfc3339();
    let client = DbClient {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        name,
        email: input.email,
        phone: input.phone,
        client_type,
        notes: input.notes,
        is_deleted: false,
        created_at: now.clone(),
        updated_at: now,
    };
    state.db()?.upsert_client(&client)?;
    Ok(Json(client))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DbClient>, AppError> {
    let db = state.db()?;
    db.get_client(&user.id, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Client".to_string()))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<ClientInput>,
) -> Result<Json<DbClient>, AppError> {
    let (name, client_type) = validate(&input)?;

    let db = state.db()?;
    let mut client = db
        .get_client(&user.id, &id)?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

    client.name = name;
    client.email = input.email;
    client.phone = input.phone;
    client.client_type = client_type;
    client.notes = input.notes;
    client.updated_at = Utc::now().to_rfc3339();
    db.upsert_client(&client)?;
    Ok(Json(client))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db()?;
    if !db.soft_delete_client(&user.id, &id)? {
        return Err(AppError::NotFound("Client".to_string()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
