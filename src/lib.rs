pub mod aggregator;
pub mod analysis;
pub mod commands;
pub mod composer;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod refresh;
pub mod samples;

#[cfg(test)]
mod test_utils;

use config::AppConfig;
use refresh::RefreshCoordinator;
use samples::OuraHeartRateSource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
  let _ = tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulse_log_lib=info")))
    .with(tracing_subscriber::fmt::layer())
    .try_init();
}

/// Recompute every rollup for the configured user, then back-fill
/// heart-rate scores for unscored sessions when an Oura token is set.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  init_tracing();

  let config = AppConfig::from_env()?;
  tracing::info!("Starting pulse-log v{}", env!("CARGO_PKG_VERSION"));

  let runtime = tokio::runtime::Runtime::new()?;
  runtime.block_on(async move {
    let pool = db::initialize_db(&config.database_url).await?;

    let rollups = commands::recompute_all(&pool, &config.user_id).await?;
    for report in &rollups {
      println!("{}", serde_json::to_string(report)?);
    }

    if config.oura_access_token.is_some() {
      let coordinator = RefreshCoordinator::new(OuraHeartRateSource::from_config(&config)?);
      let scored = commands::backfill_unscored(&pool, &coordinator, &config.user_id).await?;
      for report in &scored {
        println!("{}", serde_json::to_string(report)?);
      }
    } else {
      tracing::info!("OURA_ACCESS_TOKEN not set, skipping score back-fill");
    }

    pool.close().await;
    Ok::<(), Box<dyn std::error::Error>>(())
  })
}
