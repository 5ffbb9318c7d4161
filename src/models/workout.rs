use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::history::History;

/// One movement inside a workout template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
  pub id: Uuid,
  pub name: String,
  /// Position within the workout. Not required to be unique or contiguous.
  pub order: i64,
}

impl Exercise {
  pub fn new(name: impl Into<String>, order: i64) -> Self {
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      order,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
  pub id: Uuid,
  /// Opaque user id handed out by the identity provider
  pub owner_id: String,
  pub title: String,
  /// Definition order is significant: it breaks ties between equal `order` values.
  pub exercises: Vec<Exercise>,
  pub rounds_enabled: bool,
  pub rounds_quantity: u32,
  /// Cached personal best in minutes, see `aggregator::recompute_fastest_time`
  pub fastest_time: Option<f64>,
  pub generated_summary: Option<String>,
  pub history: Vec<History>,
  /// Name of the seeded `Category` this workout is filed under
  pub category: Option<String>,
}

impl Workout {
  pub fn new(owner_id: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      owner_id: owner_id.into(),
      title: title.into(),
      exercises: Vec::new(),
      rounds_enabled: false,
      rounds_quantity: 1,
      fastest_time: None,
      generated_summary: None,
      history: Vec::new(),
      category: None,
    }
  }

  /// Number of times the exercise list is performed back-to-back.
  /// Always 1 while rounds are switched off.
  pub fn rounds_multiplier(&self) -> u32 {
    if self.rounds_enabled {
      self.rounds_quantity.max(1)
    } else {
      1
    }
  }

  pub fn exercise(&self, id: Uuid) -> Option<&Exercise> {
    self.exercises.iter().find(|e| e.id == id)
  }

  pub fn history_entry(&self, id: Uuid) -> Option<&History> {
    self.history.iter().find(|h| h.id == id)
  }

  pub fn history_entry_mut(&mut self, id: Uuid) -> Option<&mut History> {
    self.history.iter_mut().find(|h| h.id == id)
  }

  /// Append a completed session. Rollups are not refreshed here;
  /// callers follow up with `aggregator::recompute_fastest_time`.
  pub fn record_session(&mut self, entry: History) {
    self.history.push(entry);
  }

  pub fn remove_session(&mut self, id: Uuid) -> Option<History> {
    let idx = self.history.iter().position(|h| h.id == id)?;
    Some(self.history.remove(idx))
  }
}
