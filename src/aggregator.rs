//! Per-workout rollups derived from session history.
//!
//! `fastest_time` and `generated_summary` on a `Workout` are caches over
//! its `history`. They are recomputed here, in memory; the caller commits
//! the aggregate (see `db::commit_rollups`).

use chrono::{DateTime, Duration, Utc};

use crate::composer;
use crate::error::AnalysisError;
use crate::models::Workout;

/// Minimum positive session duration, written back to `workout.fastest_time`.
///
/// Must be called whenever history is added, removed, or a duration edited.
pub fn recompute_fastest_time(workout: &mut Workout) -> Option<f64> {
  let fastest = workout
    .history
    .iter()
    .map(|h| h.last_session_duration)
    .filter(|d| *d > 0.0)
    .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |curr| curr.min(d))));

  workout.fastest_time = fastest;
  fastest
}

/// Cached fastest time, falling back to the minimum over every recorded
/// duration. The fallback can legitimately be 0 (or below, for corrupt rows).
/// Returns 0 when there is no history at all.
pub fn default_duration(workout: &Workout) -> f64 {
  if let Some(fastest) = workout.fastest_time {
    return fastest;
  }
  workout
    .history
    .iter()
    .map(|h| h.last_session_duration)
    .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |curr| curr.min(d))))
    .unwrap_or(0.0)
}

/// Personal-best baseline for the progress pulse score.
/// Negative infinity when no PR exists, so "matched the PR" never triggers.
pub fn pr_baseline(workout: &Workout) -> f64 {
  workout.fastest_time.unwrap_or(f64::NEG_INFINITY)
}

/// Mean session duration in minutes, None without history
pub fn average_duration(workout: &Workout) -> Option<f64> {
  if workout.history.is_empty() {
    return None;
  }
  let total: f64 = workout.history.iter().map(|h| h.last_session_duration).sum();
  Some(total / workout.history.len() as f64)
}

/// Compact human rendering of a duration in seconds
pub fn format_duration(seconds: f64) -> String {
  let total = seconds.max(0.0).round() as i64;
  let hours = total / 3600;
  let minutes = (total % 3600) / 60;
  let secs = total % 60;

  if hours > 0 {
    format!("{} h {} min", hours, minutes)
  } else if minutes > 0 && secs > 0 {
    format!("{} min {} s", minutes, secs)
  } else if minutes > 0 {
    format!("{} min", minutes)
  } else {
    format!("{} s", secs)
  }
}

/// Build the summary sentence and store it on the workout.
///
/// - Empty history: clears the summary and returns `Ok(None)`.
/// - Negative average (corrupt durations): `Err(InvalidInput)`, the stored
///   summary is left as it was.
pub fn generate_summary(workout: &mut Workout) -> Result<Option<String>, AnalysisError> {
  let Some(average_minutes) = average_duration(workout) else {
    workout.generated_summary = None;
    return Ok(None);
  };

  let average_seconds = average_minutes * 60.0;
  if average_seconds < 0.0 || !average_seconds.is_finite() {
    tracing::warn!(
      workout = %workout.id,
      average_seconds,
      "refusing to summarise workout with invalid average duration"
    );
    return Err(AnalysisError::invalid(format!(
      "average session duration is {:.1}s for workout '{}'",
      average_seconds, workout.title
    )));
  }

  let count = workout.history.len();
  let names = composer::exercise_names(workout);
  let summary = format!(
    "Completed {} {} with an average duration of {}. Exercises: {}.",
    count,
    if count == 1 { "time" } else { "times" },
    format_duration(average_seconds),
    if names.is_empty() { "none" } else { names.as_str() },
  );

  workout.generated_summary = Some(summary.clone());
  Ok(Some(summary))
}

/// Sessions across all of a user's workouts completed in `(now - days, now]`
pub fn sessions_in_window(workouts: &[Workout], now: DateTime<Utc>, days: i64) -> u32 {
  let window_start = now - Duration::days(days);
  workouts
    .iter()
    .flat_map(|w| w.history.iter())
    .filter(|h| h.date > window_start && h.date <= now)
    .count() as u32
}
