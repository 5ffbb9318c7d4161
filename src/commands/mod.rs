pub mod rollups;
pub mod scores;

pub use rollups::{recompute_all, recompute_rollups, RollupReport};
pub use scores::{backfill_scores, backfill_unscored, ScoreReport};

use serde::Serialize;

use crate::config::ConfigError;
use crate::db::StoreError;
use crate::error::AnalysisError;
use crate::samples::SampleError;

/// Failure of a command that spans storage, sample fetching and analysis
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Samples(#[from] SampleError),

  #[error(transparent)]
  Analysis(#[from] AnalysisError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Missing user setting: {0}")]
  MissingSetting(&'static str),
}

impl Serialize for CommandError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}
