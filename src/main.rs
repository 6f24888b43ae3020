use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use porchlight::config;
use porchlight::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = config::load_config()?;

    let state = Arc::new(
        AppState::new(&config).map_err(|e| format!("Failed to open database: {e}"))?,
    );
    info!("database at {}", state.db_path.display());

    if let Some(email) = &config.bootstrap_email {
        bootstrap_user(&state, email, config.session_ttl_days)?;
    }

    match state.db().ok().map(|db| db.purge_expired_sessions()) {
        Some(Ok(purged)) if purged > 0 => info!("purged {purged} expired sessions"),
        Some(Err(e)) => error!("session purge failed: {e}"),
        _ => {}
    }

    let app = porchlight::http::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {e}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {e}"))
}

/// Ensure the configured user exists and has a fresh session. The token is
/// logged exactly once; it is not recoverable from the database afterwards.
fn bootstrap_user(state: &Arc<AppState>, email: &str, ttl_days: i64) -> Result<(), String> {
    let db = state
        .db()
        .map_err(|_| "Database lock poisoned".to_string())?;

    let user = match db
        .get_user_by_email(email)
        .map_err(|e| format!("Bootstrap lookup failed: {e}"))?
    {
        Some(user) => user,
        None => {
            let user = porchlight::db::DbUser {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                display_name: email
                    .split('@')
                    .next()
                    .unwrap_or(email)
                    .to_string(),
                created_at: Utc::now().to_rfc3339(),
            };
            db.create_user(&user)
                .map_err(|e| format!("Bootstrap user creation failed: {e}"))?;
            info!("created bootstrap user {email}");
            user
        }
    };

    let token = db
        .create_session(&user.id, Duration::days(ttl_days))
        .map_err(|e| format!("Bootstrap session creation failed: {e}"))?;
    info!("session token for {email}: {token}");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install shutdown handler: {e}");
    } else {
        info!("shutting down");
    }
}
