//! Shared server state.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::Config;
use crate::db::{CrmDb, DbError};
use crate::error::AppError;

/// State shared across request handlers.
///
/// The request path serializes database access through one mutex-guarded
/// handle; background work opens its own connection from `db_path` instead of
/// contending for this one.
pub struct AppState {
    pub db: Mutex<CrmDb>,
    pub db_path: PathBuf,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, DbError> {
        let db_path = if config.db_path.is_empty() {
            CrmDb::default_path()?
        } else {
            PathBuf::from(&config.db_path)
        };
        let db = CrmDb::open_at(&db_path)?;
        Ok(Self {
            db: Mutex::new(db),
            db_path,
        })
    }

    /// Lock the database handle, mapping poison to an internal error.
    pub fn db(&self) -> Result<std::sync::MutexGuard<'_, CrmDb>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("Database lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("state.db");
        std::mem::forget(dir);
        let config = Config {
            db_path: path.to_string_lossy().into_owned(),
            ..Config::default()
        };
        AppState::new(&config).expect("state")
    }

    #[test]
    fn test_new_opens_database_at_configured_path() {
        let state = test_state();
        assert!(state.db_path.exists());

        let guard = state.db().expect("lock");
        let count: i32 = guard
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM deals", [], |row| row.get(0))
            .expect("schema applied");
        assert_eq!(count, 0);
    }
}
