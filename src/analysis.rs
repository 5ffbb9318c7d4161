//! Deterministic scoring layer for heart-rate data
//!
//! Turns a session's raw heart-rate samples into the scores stored on a
//! `History` entry: intensity (heart-rate reserve), time in zones with the
//! dominant zone, and the composite progress pulse score.
//! Nothing here holds state between calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::models::History;

/// ---------------------------------------------------------------------------
/// User Settings (needed for score calculations)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
  pub resting_hr: Option<f64>,
  pub max_hr: Option<f64>,
  pub age: Option<i64>,
  pub target_workouts_per_week: u32,
  pub trailing_policy: TrailingPolicy,
}

impl Default for UserSettings {
  fn default() -> Self {
    Self {
      resting_hr: None,
      max_hr: None,
      age: None,
      target_workouts_per_week: 4,
      trailing_policy: TrailingPolicy::Drop,
    }
  }
}

impl UserSettings {
  /// Get max HR, falling back to 220 - age if not set
  pub fn effective_max_hr(&self) -> Option<f64> {
    self
      .max_hr
      .or_else(|| self.age.filter(|a| *a > 0 && *a < 220).map(|a| (220 - a) as f64))
  }
}

/// How the interval after the last sample is attributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingPolicy {
  /// The last sample has no following gap and contributes nothing
  #[default]
  Drop,
  /// The last sample's zone is credited up to the end of the window
  UntilWindowEnd,
}

impl TrailingPolicy {
  pub fn as_str(&self) -> &'static str {
    match self {
      TrailingPolicy::Drop => "drop",
      TrailingPolicy::UntilWindowEnd => "until_window_end",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "drop" => Some(TrailingPolicy::Drop),
      "until_window_end" => Some(TrailingPolicy::UntilWindowEnd),
      _ => None,
    }
  }
}

/// ---------------------------------------------------------------------------
/// HR Samples and Zones
/// ---------------------------------------------------------------------------

/// One heart-rate observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrSample {
  pub timestamp: DateTime<Utc>,
  pub bpm: f64,
}

impl HrSample {
  pub fn new(timestamp: DateTime<Utc>, bpm: f64) -> Self {
    Self { timestamp, bpm }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HrZone {
  Z1, // < 50% max
  Z2, // 50-60% max
  Z3, // 60-70% max
  Z4, // 70-80% max
  Z5, // >= 80% max
}

impl HrZone {
  pub const ALL: [HrZone; 5] = [HrZone::Z1, HrZone::Z2, HrZone::Z3, HrZone::Z4, HrZone::Z5];

  pub fn from_hr(hr: f64, max_hr: f64) -> Self {
    let fraction = hr / max_hr;
    match fraction {
      f if f < 0.5 => HrZone::Z1,
      f if f < 0.6 => HrZone::Z2,
      f if f < 0.7 => HrZone::Z3,
      f if f < 0.8 => HrZone::Z4,
      _ => HrZone::Z5,
    }
  }

  /// Zone number, 1 through 5
  pub fn number(&self) -> u8 {
    match self {
      HrZone::Z1 => 1,
      HrZone::Z2 => 2,
      HrZone::Z3 => 3,
      HrZone::Z4 => 4,
      HrZone::Z5 => 5,
    }
  }

  pub fn from_number(n: i64) -> Option<Self> {
    match n {
      1 => Some(HrZone::Z1),
      2 => Some(HrZone::Z2),
      3 => Some(HrZone::Z3),
      4 => Some(HrZone::Z4),
      5 => Some(HrZone::Z5),
      _ => None,
    }
  }

  fn index(&self) -> usize {
    self.number() as usize - 1
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      HrZone::Z1 => "Z1",
      HrZone::Z2 => "Z2",
      HrZone::Z3 => "Z3",
      HrZone::Z4 => "Z4",
      HrZone::Z5 => "Z5",
    }
  }
}

/// ---------------------------------------------------------------------------
/// Intensity Score
/// ---------------------------------------------------------------------------

/// Heart-rate reserve percentage of the window's mean HR, clamped to [0, 100].
///
/// `Ok(None)` when the window holds no samples.
pub fn intensity_score(
  samples: &[HrSample],
  resting_hr: f64,
  max_hr: f64,
) -> Result<Option<f64>, AnalysisError> {
  if !(resting_hr > 0.0) {
    return Err(AnalysisError::invalid(format!(
      "resting heart rate must be positive, got {}",
      resting_hr
    )));
  }
  if !(max_hr > resting_hr) {
    return Err(AnalysisError::invalid(format!(
      "max heart rate {} must exceed resting heart rate {}",
      max_hr, resting_hr
    )));
  }
  if samples.is_empty() {
    return Ok(None);
  }

  let avg_hr = samples.iter().map(|s| s.bpm).sum::<f64>() / samples.len() as f64;
  let raw = (avg_hr - resting_hr) / (max_hr - resting_hr) * 100.0;
  Ok(Some(raw.clamp(0.0, 100.0)))
}

/// ---------------------------------------------------------------------------
/// Time in Zones
/// ---------------------------------------------------------------------------

/// Seconds spent in each zone plus the zone with the most time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBreakdown {
  /// Indexed by zone number - 1
  pub seconds: [f64; 5],
  pub dominant: HrZone,
}

impl ZoneBreakdown {
  pub fn seconds_in(&self, zone: HrZone) -> f64 {
    self.seconds[zone.index()]
  }

  pub fn total_seconds(&self) -> f64 {
    self.seconds.iter().sum()
  }

  /// Percentage of recorded time per zone
  pub fn percentages(&self) -> [f64; 5] {
    let total = self.total_seconds();
    let mut pct = [0.0; 5];
    if total > 0.0 {
      for (p, s) in pct.iter_mut().zip(self.seconds.iter()) {
        *p = s / total * 100.0;
      }
    }
    pct
  }
}

/// Attribute the gap after each sample to that sample's zone.
///
/// `window_end` is only consulted under `TrailingPolicy::UntilWindowEnd`.
/// Returns `Ok(None)` without samples, or when no time could be attributed.
pub fn time_in_zones(
  samples: &[HrSample],
  max_hr: f64,
  policy: TrailingPolicy,
  window_end: DateTime<Utc>,
) -> Result<Option<ZoneBreakdown>, AnalysisError> {
  if !(max_hr > 0.0) {
    return Err(AnalysisError::invalid(format!(
      "max heart rate must be positive, got {}",
      max_hr
    )));
  }
  if samples.is_empty() {
    return Ok(None);
  }
  if let Some(pair) = samples.windows(2).find(|w| w[1].timestamp < w[0].timestamp) {
    return Err(AnalysisError::invalid(format!(
      "samples out of order: {} follows {}",
      pair[1].timestamp, pair[0].timestamp
    )));
  }

  let mut seconds = [0.0_f64; 5];
  for pair in samples.windows(2) {
    let gap = (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64 / 1000.0;
    seconds[HrZone::from_hr(pair[0].bpm, max_hr).index()] += gap;
  }

  if policy == TrailingPolicy::UntilWindowEnd {
    if let Some(last) = samples.last() {
      let tail = (window_end - last.timestamp).num_milliseconds() as f64 / 1000.0;
      if tail > 0.0 {
        seconds[HrZone::from_hr(last.bpm, max_hr).index()] += tail;
      }
    }
  }

  if seconds.iter().all(|s| *s <= 0.0) {
    return Ok(None);
  }

  Ok(Some(ZoneBreakdown {
    seconds,
    dominant: dominant_zone(&seconds),
  }))
}

/// Zone with the greatest time; ties go to the lowest zone
fn dominant_zone(seconds: &[f64; 5]) -> HrZone {
  let mut best = HrZone::Z1;
  for zone in HrZone::ALL.iter().skip(1) {
    // strictly greater, so an earlier zone keeps a tie
    if seconds[zone.index()] > seconds[best.index()] {
      best = *zone;
    }
  }
  best
}

/// ---------------------------------------------------------------------------
/// Progress Pulse Score
/// ---------------------------------------------------------------------------

const PULSE_BASE: f64 = 50.0;
const PULSE_PR_BONUS: f64 = 15.0;
const PULSE_PER_WORKOUT: f64 = 5.0;

/// Composite [0, 100] score: base 50, +15 for matching or beating the PR,
/// +5 per workout this week up to the target, +10 for zone 4-5, +5 for zone 3.
///
/// Pass `f64::NEG_INFINITY` as `fastest_time` when no PR exists yet so the
/// PR comparison can never hold.
pub fn progress_pulse_score(
  fastest_time: f64,
  current_duration: f64,
  workouts_this_week: u32,
  target_workouts_per_week: u32,
  dominant_zone: Option<HrZone>,
) -> f64 {
  let mut score = PULSE_BASE;

  if current_duration <= fastest_time {
    score += PULSE_PR_BONUS;
  }

  score += PULSE_PER_WORKOUT * workouts_this_week.min(target_workouts_per_week) as f64;

  score += match dominant_zone {
    Some(HrZone::Z4) | Some(HrZone::Z5) => 10.0,
    Some(HrZone::Z3) => 5.0,
    _ => 0.0,
  };

  score.clamp(0.0, 100.0)
}

/// ---------------------------------------------------------------------------
/// Session Scores (back-fill for one History entry)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScores {
  pub intensity_score: Option<f64>,
  pub zones: Option<ZoneBreakdown>,
  pub progress_pulse_score: f64,
}

/// Everything `SessionScores::compute` needs besides the samples
#[derive(Debug, Clone)]
pub struct ScoringInput {
  pub resting_hr: f64,
  pub max_hr: f64,
  pub window_end: DateTime<Utc>,
  pub trailing_policy: TrailingPolicy,
  /// PR baseline, `f64::NEG_INFINITY` when none
  pub fastest_time: f64,
  pub current_duration: f64,
  pub workouts_this_week: u32,
  pub target_workouts_per_week: u32,
}

impl SessionScores {
  pub fn compute(samples: &[HrSample], input: &ScoringInput) -> Result<Self, AnalysisError> {
    let intensity_score = intensity_score(samples, input.resting_hr, input.max_hr)?;
    let zones = time_in_zones(samples, input.max_hr, input.trailing_policy, input.window_end)?;

    let progress_pulse_score = progress_pulse_score(
      input.fastest_time,
      input.current_duration,
      input.workouts_this_week,
      input.target_workouts_per_week,
      zones.as_ref().map(|z| z.dominant),
    );

    Ok(Self {
      intensity_score,
      zones,
      progress_pulse_score,
    })
  }

  pub fn dominant_zone(&self) -> Option<HrZone> {
    self.zones.as_ref().map(|z| z.dominant)
  }

  /// Write the scores onto the session; the caller commits
  pub fn apply_to(&self, entry: &mut History) {
    entry.intensity_score = self.intensity_score;
    entry.progress_pulse_score = Some(self.progress_pulse_score);
    entry.dominant_zone = self.dominant_zone();
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
