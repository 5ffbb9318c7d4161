use serde::Serialize;
use uuid::Uuid;

use crate::aggregator;
use crate::analysis::{HrZone, ScoringInput, SessionScores, UserSettings};
use crate::db::{self, DbPool};
use crate::models::Workout;
use crate::refresh::RefreshCoordinator;
use crate::samples::HeartRateSource;

use super::CommandError;

/// ---------------------------------------------------------------------------
/// Heart-Rate Score Back-fill
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
  pub workout_id: Uuid,
  pub history_id: Uuid,
  pub sample_count: usize,
  pub intensity_score: Option<f64>,
  pub progress_pulse_score: f64,
  pub dominant_zone: Option<HrZone>,
  /// Seconds per zone, Z1 first
  pub zone_seconds: Option<[f64; 5]>,
}

/// Fetch the samples recorded during one session, score them and commit
/// the scores onto the history entry.
pub async fn backfill_scores<S>(
  pool: &DbPool,
  coordinator: &RefreshCoordinator<S>,
  owner_id: &str,
  workout_id: Uuid,
  history_id: Uuid,
) -> Result<ScoreReport, CommandError>
where
  S: HeartRateSource + 'static,
{
  let settings = db::get_user_settings(pool, owner_id).await?;
  let workouts = db::load_workouts_for_owner(pool, owner_id).await?;
  let workout = workouts
    .iter()
    .find(|w| w.id == workout_id)
    .ok_or_else(|| CommandError::NotFound(format!("workout {}", workout_id)))?;

  score_entry(pool, coordinator, owner_id, &settings, &workouts, workout, history_id).await
}

/// Back-fill every session of the user whose heart-rate samples have not
/// been scored yet.
///
/// A session scored from an empty window is picked up again on the next
/// run, so samples that sync late still land. Sessions whose samples can't
/// be fetched or scored are logged and skipped.
pub async fn backfill_unscored<S>(
  pool: &DbPool,
  coordinator: &RefreshCoordinator<S>,
  owner_id: &str,
) -> Result<Vec<ScoreReport>, CommandError>
where
  S: HeartRateSource + 'static,
{
  let settings = db::get_user_settings(pool, owner_id).await?;
  let workouts = db::load_workouts_for_owner(pool, owner_id).await?;

  let pending: Vec<(&Workout, Uuid)> = workouts
    .iter()
    .flat_map(|w| w.history.iter().filter(|h| !h.has_sample_scores()).map(move |h| (w, h.id)))
    .collect();
  tracing::info!(owner_id, pending = pending.len(), "back-filling session scores");

  let mut reports = Vec::with_capacity(pending.len());
  for (workout, history_id) in pending {
    match score_entry(pool, coordinator, owner_id, &settings, &workouts, workout, history_id).await {
      Ok(report) => reports.push(report),
      Err(CommandError::Samples(e)) => {
        tracing::warn!(history = %history_id, error = %e, "skipping session, samples unavailable");
      }
      Err(CommandError::Analysis(e)) => {
        tracing::warn!(history = %history_id, error = %e, "skipping session, samples rejected");
      }
      Err(e) => return Err(e),
    }
  }

  Ok(reports)
}

fn heart_rate_range(settings: &UserSettings) -> Result<(f64, f64), CommandError> {
  let resting_hr = settings
    .resting_hr
    .ok_or(CommandError::MissingSetting("resting heart rate"))?;
  let max_hr = settings
    .effective_max_hr()
    .ok_or(CommandError::MissingSetting("max heart rate or age"))?;
  Ok((resting_hr, max_hr))
}

async fn score_entry<S>(
  pool: &DbPool,
  coordinator: &RefreshCoordinator<S>,
  owner_id: &str,
  settings: &UserSettings,
  all_workouts: &[Workout],
  workout: &Workout,
  history_id: Uuid,
) -> Result<ScoreReport, CommandError>
where
  S: HeartRateSource + 'static,
{
  let (resting_hr, max_hr) = heart_rate_range(settings)?;

  let mut entry = workout
    .history_entry(history_id)
    .cloned()
    .ok_or_else(|| CommandError::NotFound(format!("history {}", history_id)))?;

  // The cached PR may be stale; score against the current history
  let mut current = workout.clone();
  aggregator::recompute_fastest_time(&mut current);

  let start = entry.started_at();
  let end = entry.date;
  let samples = coordinator.fetch(owner_id, start, end).await?;

  let input = ScoringInput {
    resting_hr,
    max_hr,
    window_end: end,
    trailing_policy: settings.trailing_policy,
    fastest_time: aggregator::pr_baseline(&current),
    current_duration: entry.last_session_duration,
    workouts_this_week: aggregator::sessions_in_window(all_workouts, entry.date, 7),
    target_workouts_per_week: settings.target_workouts_per_week,
  };

  let scores = SessionScores::compute(&samples, &input)?;
  scores.apply_to(&mut entry);
  db::commit_scores(pool, &entry).await?;

  tracing::info!(
    history = %entry.id,
    samples = samples.len(),
    pulse = scores.progress_pulse_score,
    "session scored"
  );

  Ok(ScoreReport {
    workout_id: workout.id,
    history_id: entry.id,
    sample_count: samples.len(),
    intensity_score: scores.intensity_score,
    progress_pulse_score: scores.progress_pulse_score,
    dominant_zone: scores.dominant_zone(),
    zone_seconds: scores.zones.as_ref().map(|z| z.seconds),
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
