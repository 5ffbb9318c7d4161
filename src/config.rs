//! Process configuration read from the environment (and `.env` via dotenvy)

use std::env;

/// Oura API v2 user collection endpoints
pub const OURA_API_BASE: &str = "https://api.ouraring.com/v2/usercollection";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://pulse-log.db?mode=rwc";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  Missing(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub database_url: String,
  /// Opaque id from the identity provider, selects whose workouts to process
  pub user_id: String,
  /// Enables score back-fill when present
  pub oura_access_token: Option<String>,
  pub oura_api_base: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Ok(Self {
      database_url: env::var("PULSE_DATABASE_URL")
        .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
      user_id: env::var("PULSE_USER_ID")
        .map_err(|_| ConfigError::Missing("PULSE_USER_ID".into()))?,
      oura_access_token: env::var("OURA_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
      oura_api_base: env::var("OURA_API_BASE").unwrap_or_else(|_| OURA_API_BASE.to_string()),
    })
  }
}
