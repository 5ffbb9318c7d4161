use serde::Serialize;
use uuid::Uuid;

use crate::aggregator;
use crate::db::{self, DbPool};
use crate::error::AnalysisError;
use crate::models::Workout;

use super::CommandError;

/// ---------------------------------------------------------------------------
/// Workout Rollups
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RollupReport {
  pub workout_id: Uuid,
  pub title: String,
  pub fastest_time: Option<f64>,
  pub summary: Option<String>,
  /// Set when the summary was rejected; the previous summary is kept
  pub summary_error: Option<AnalysisError>,
}

/// Recompute the cached rollups of one workout and commit them
pub async fn recompute_rollups(pool: &DbPool, workout_id: Uuid) -> Result<RollupReport, CommandError> {
  let mut workout = db::load_workout(pool, workout_id).await?;
  refresh_and_commit(pool, &mut workout).await
}

/// Recompute rollups for every workout the user owns
pub async fn recompute_all(pool: &DbPool, owner_id: &str) -> Result<Vec<RollupReport>, CommandError> {
  let workouts = db::load_workouts_for_owner(pool, owner_id).await?;
  tracing::info!(owner_id, count = workouts.len(), "recomputing workout rollups");

  let mut reports = Vec::with_capacity(workouts.len());
  for mut workout in workouts {
    reports.push(refresh_and_commit(pool, &mut workout).await?);
  }
  Ok(reports)
}

async fn refresh_and_commit(pool: &DbPool, workout: &mut Workout) -> Result<RollupReport, CommandError> {
  let fastest_time = aggregator::recompute_fastest_time(workout);

  let summary_error = match aggregator::generate_summary(workout) {
    Ok(_) => None,
    Err(e) => {
      tracing::warn!(workout = %workout.id, error = %e, "summary not regenerated");
      Some(e)
    }
  };

  if let Err(e) = db::commit_rollups(pool, workout).await {
    tracing::error!(workout = %workout.id, error = %e, "failed to commit rollups");
    return Err(e.into());
  }

  Ok(RollupReport {
    workout_id: workout.id,
    title: workout.title.clone(),
    fastest_time,
    summary: workout.generated_summary.clone(),
    summary_error,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::StoreError;
  use crate::test_utils::{mock_workout, setup_test_db, teardown_test_db};

  #[tokio::test]
  async fn test_recompute_rollups_commits_fastest_and_summary() {
    let pool = setup_test_db().await;
    let mut workout = mock_workout("user-1", "Full Body", &[14.0, 0.0, 9.5]);
    workout.fastest_time = Some(99.0); // stale
    db::save_workout(&pool, &workout).await.unwrap();

    let report = recompute_rollups(&pool, workout.id).await.unwrap();

    // Zero durations never count as a PR
    assert_eq!(report.fastest_time, Some(9.5));
    assert_eq!(
      report.summary.as_deref(),
      Some("Completed 3 times with an average duration of 7 min 50 s. Exercises: Squat, Press, Row.")
    );
    assert!(report.summary_error.is_none());

    let loaded = db::load_workout(&pool, workout.id).await.unwrap();
    assert_eq!(loaded.fastest_time, Some(9.5));
    assert_eq!(loaded.generated_summary, report.summary);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_rejected_summary_keeps_previous_one() {
    let pool = setup_test_db().await;
    let mut workout = mock_workout("user-1", "Corrupt", &[-30.0, 10.0]);
    workout.generated_summary = Some("previous".to_string());
    db::save_workout(&pool, &workout).await.unwrap();

    let report = recompute_rollups(&pool, workout.id).await.unwrap();

    assert_eq!(report.fastest_time, Some(10.0));
    assert!(matches!(report.summary_error, Some(AnalysisError::InvalidInput(_))));
    assert_eq!(report.summary.as_deref(), Some("previous"));

    let loaded = db::load_workout(&pool, workout.id).await.unwrap();
    assert_eq!(loaded.fastest_time, Some(10.0));
    assert_eq!(loaded.generated_summary.as_deref(), Some("previous"));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_empty_history_clears_rollups() {
    let pool = setup_test_db().await;
    let mut workout = mock_workout("user-1", "Fresh", &[]);
    workout.fastest_time = Some(12.0);
    workout.generated_summary = Some("stale".to_string());
    db::save_workout(&pool, &workout).await.unwrap();

    let report = recompute_rollups(&pool, workout.id).await.unwrap();
    assert_eq!(report.fastest_time, None);
    assert_eq!(report.summary, None);

    let loaded = db::load_workout(&pool, workout.id).await.unwrap();
    assert_eq!(loaded.fastest_time, None);
    assert_eq!(loaded.generated_summary, None);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_recompute_all_only_touches_owner() {
    let pool = setup_test_db().await;
    let mine = mock_workout("user-1", "Mine", &[20.0]);
    let theirs = mock_workout("user-2", "Theirs", &[15.0]);
    db::save_workout(&pool, &mine).await.unwrap();
    db::save_workout(&pool, &theirs).await.unwrap();

    let reports = recompute_all(&pool, "user-1").await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].workout_id, mine.id);

    let untouched = db::load_workout(&pool, theirs.id).await.unwrap();
    assert_eq!(untouched.fastest_time, None);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_recompute_missing_workout() {
    let pool = setup_test_db().await;

    let err = recompute_rollups(&pool, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CommandError::Store(StoreError::NotFound(_))));

    teardown_test_db(pool).await;
  }
}
