//! Session authentication for request handlers.
//!
//! Handlers take an `AuthUser` argument; extraction resolves the presented
//! token to a user row or rejects the request with a 401 envelope. Tokens
//! arrive either as `Authorization: Bearer <token>` or as a `session` cookie,
//! with the header winning when both are present.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::db::DbUser;
use crate::error::AppError;
use crate::state::AppState;

pub struct AuthUser(pub DbUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing session token".to_string()))?;

        let db = state.db()?;
        let user = db
            .validate_session(&token)?
            .ok_or_else(|| AppError::Authentication("Invalid or expired session".to_string()))?;
        Ok(AuthUser(user))
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_cookie)
}

fn session_cookie(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "session" && !value.is_empty()).then(|| value.to_string())
    })
}
