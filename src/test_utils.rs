//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Helper assertions

use crate::analysis::{HrSample, TrailingPolicy, UserSettings};
use crate::db::{self, DbPool};
use crate::models::{Exercise, History, Workout};
use chrono::{DateTime, Duration, Utc};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations, seeds categories and returns a ready-to-use pool
///
/// `initialize_db` caps in-memory pools at one connection; a second
/// connection would open its own empty database
pub async fn setup_test_db() -> DbPool {
  db::initialize_db("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database")
}

/// Close a test database pool
pub async fn teardown_test_db(pool: DbPool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Settings with a 60-190 heart-rate range
pub fn mock_user_settings() -> UserSettings {
  UserSettings {
    resting_hr: Some(60.0),
    max_hr: Some(190.0),
    age: Some(32),
    target_workouts_per_week: 4,
    trailing_policy: TrailingPolicy::Drop,
  }
}

/// A three-exercise workout with one history entry per duration,
/// the first entry being the most recent (one day apart)
pub fn mock_workout(owner_id: &str, title: &str, durations: &[f64]) -> Workout {
  let mut workout = Workout::new(owner_id, title);
  workout.exercises = vec![
    Exercise::new("Squat", 0),
    Exercise::new("Press", 1),
    Exercise::new("Row", 2),
  ];
  for (i, duration) in durations.iter().enumerate() {
    workout.record_session(History::new(datetime_days_ago(i as i64 + 1), *duration));
  }
  workout
}

/// Evenly spaced samples starting at `start`
pub fn mock_samples(start: DateTime<Utc>, step_seconds: i64, bpms: &[f64]) -> Vec<HrSample> {
  bpms
    .iter()
    .enumerate()
    .map(|(i, bpm)| HrSample::new(start + Duration::seconds(step_seconds * i as i64), *bpm))
    .collect()
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Create a DateTime N days ago from now, truncated to whole seconds
/// so it survives a database round trip unchanged
pub fn datetime_days_ago(days: i64) -> DateTime<Utc> {
  let now = DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap_or_else(Utc::now);
  now - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('workouts', 'exercises', 'history', 'split_times', 'categories', 'user_settings')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 6, "Expected 6 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_workout_orders_history_newest_first() {
    let workout = mock_workout("user-1", "Mock", &[10.0, 20.0, 30.0]);
    assert_eq!(workout.exercises.len(), 3);
    assert_eq!(workout.history.len(), 3);
    assert!(workout.history[0].date > workout.history[2].date);
    assert_eq!(workout.history[0].date.timestamp_subsec_nanos(), 0);
  }

  #[test]
  fn test_mock_samples_spacing() {
    let start = datetime_days_ago(0);
    let samples = mock_samples(start, 5, &[100.0, 110.0, 120.0]);
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[2].timestamp - samples[0].timestamp, Duration::seconds(10));
  }
}
