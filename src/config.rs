//! Server configuration.
//!
//! Loaded from `~/.porchlight/config.json` (or the file named by
//! `PORCHLIGHT_CONFIG`). A missing file yields the defaults; a present but
//! malformed file is an error. Individual fields can be overridden with
//! environment variables, which wins over the file.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// SQLite database file. Empty means the default path under
    /// `~/.porchlight/`.
    pub db_path: String,
    /// When set, a user with this email (and a session for it) is created at
    /// startup if missing. The session token is logged once.
    pub bootstrap_email: Option<String>,
    /// Session lifetime in days.
    pub session_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8743".to_string(),
            db_path: String::new(),
            bootstrap_email: None,
            session_ttl_days: 30,
        }
    }
}

/// Get the canonical config file path (~/.porchlight/config.json), unless
/// PORCHLIGHT_CONFIG points elsewhere.
pub fn config_path() -> Result<PathBuf, String> {
    if let Ok(path) = std::env::var("PORCHLIGHT_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".porchlight").join("config.json"))
}

/// Load configuration: file (when present), then environment overrides.
pub fn load_config() -> Result<Config, String> {
    let path = config_path()?;

    let mut config = if path.exists() {
        let content =
            fs::read_to_string(&path).map_err(|e| format!("Failed to read config: {}", e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(addr) = std::env::var("PORCHLIGHT_BIND") {
        config.bind_addr = addr;
    }
    if let Ok(db) = std::env::var("PORCHLIGHT_DB") {
        config.db_path = db;
    }
    if let Ok(email) = std::env::var("PORCHLIGHT_BOOTSTRAP_EMAIL") {
        config.bootstrap_email = Some(email);
    }
}
