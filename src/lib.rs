pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod migrations;
pub mod services;
pub mod state;
pub mod types;
pub mod util;
