use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::HrZone;

use super::workout::Exercise;

/// Timing for one segment of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTime {
  pub id: Uuid,
  pub duration_in_seconds: f64,
  pub order: i64,
  pub exercise_id: Option<Uuid>,
  pub history_id: Option<Uuid>,
}

impl SplitTime {
  pub fn new(duration_in_seconds: f64, order: i64) -> Self {
    Self {
      id: Uuid::new_v4(),
      duration_in_seconds,
      order,
      exercise_id: None,
      history_id: None,
    }
  }
}

/// One completed session of a workout.
///
/// Immutable once recorded, apart from the three heart-rate derived
/// scores which are back-filled when samples become available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
  pub id: Uuid,
  /// Completion time of the session
  pub date: DateTime<Utc>,
  pub exercises_completed: Vec<Exercise>,
  /// Minutes
  pub last_session_duration: f64,
  pub intensity_score: Option<f64>,
  pub progress_pulse_score: Option<f64>,
  pub dominant_zone: Option<HrZone>,
  pub split_times: Vec<SplitTime>,
}

impl History {
  pub fn new(date: DateTime<Utc>, last_session_duration: f64) -> Self {
    Self {
      id: Uuid::new_v4(),
      date,
      exercises_completed: Vec::new(),
      last_session_duration,
      intensity_score: None,
      progress_pulse_score: None,
      dominant_zone: None,
      split_times: Vec::new(),
    }
  }

  /// Attach a split, linking it back to this session
  pub fn add_split(&mut self, mut split: SplitTime) {
    split.history_id = Some(self.id);
    self.split_times.push(split);
  }

  pub fn split_times_for(&self, exercise_id: Uuid) -> Vec<&SplitTime> {
    let mut splits: Vec<&SplitTime> = self
      .split_times
      .iter()
      .filter(|s| s.exercise_id == Some(exercise_id))
      .collect();
    splits.sort_by_key(|s| s.order);
    splits
  }

  /// Start of the session, derived from completion time and duration.
  /// Negative durations are treated as zero-length sessions.
  pub fn started_at(&self) -> DateTime<Utc> {
    let millis = (self.last_session_duration.max(0.0) * 60_000.0).round() as i64;
    self.date - chrono::Duration::milliseconds(millis)
  }

  pub fn is_scored(&self) -> bool {
    self.intensity_score.is_some() || self.progress_pulse_score.is_some()
  }

  /// Whether heart-rate samples have been scored for this session.
  /// A progress pulse computed from an empty window does not count.
  pub fn has_sample_scores(&self) -> bool {
    self.intensity_score.is_some()
  }
}
