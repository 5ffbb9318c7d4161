use serde::{Deserialize, Serialize};

/// External activity classification a workout can be filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityClass {
  Strength,
  Hiit,
  Running,
  Cycling,
  Walking,
  Yoga,
  Swimming,
  Core,
  Flexibility,
  Other,
}

impl ActivityClass {
  /// Metabolic equivalent of task for the class (Compendium of Physical Activities)
  pub fn met(&self) -> f64 {
    match self {
      ActivityClass::Strength => 5.0,
      ActivityClass::Hiit => 8.0,
      ActivityClass::Running => 9.8,
      ActivityClass::Cycling => 7.5,
      ActivityClass::Walking => 3.5,
      ActivityClass::Yoga => 2.5,
      ActivityClass::Swimming => 7.0,
      ActivityClass::Core => 3.8,
      ActivityClass::Flexibility => 2.3,
      ActivityClass::Other => 4.0,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ActivityClass::Strength => "strength",
      ActivityClass::Hiit => "hiit",
      ActivityClass::Running => "running",
      ActivityClass::Cycling => "cycling",
      ActivityClass::Walking => "walking",
      ActivityClass::Yoga => "yoga",
      ActivityClass::Swimming => "swimming",
      ActivityClass::Core => "core",
      ActivityClass::Flexibility => "flexibility",
      ActivityClass::Other => "other",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "strength" => Some(ActivityClass::Strength),
      "hiit" => Some(ActivityClass::Hiit),
      "running" => Some(ActivityClass::Running),
      "cycling" => Some(ActivityClass::Cycling),
      "walking" => Some(ActivityClass::Walking),
      "yoga" => Some(ActivityClass::Yoga),
      "swimming" => Some(ActivityClass::Swimming),
      "core" => Some(ActivityClass::Core),
      "flexibility" => Some(ActivityClass::Flexibility),
      "other" => Some(ActivityClass::Other),
      _ => None,
    }
  }
}

/// Read-only reference data, seeded once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub name: String,
  pub symbol: String,
  pub activity_class: ActivityClass,
}

impl Category {
  fn seed(name: &str, symbol: &str, activity_class: ActivityClass) -> Self {
    Self {
      name: name.to_string(),
      symbol: symbol.to_string(),
      activity_class,
    }
  }

  /// The seed list written on first start
  pub fn defaults() -> Vec<Category> {
    vec![
      Category::seed("Strength", "dumbbell", ActivityClass::Strength),
      Category::seed("HIIT", "bolt.heart", ActivityClass::Hiit),
      Category::seed("Running", "figure.run", ActivityClass::Running),
      Category::seed("Cycling", "bicycle", ActivityClass::Cycling),
      Category::seed("Walking", "figure.walk", ActivityClass::Walking),
      Category::seed("Yoga", "figure.yoga", ActivityClass::Yoga),
      Category::seed("Swimming", "figure.pool.swim", ActivityClass::Swimming),
      Category::seed("Core", "figure.core.training", ActivityClass::Core),
      Category::seed("Flexibility", "figure.flexibility", ActivityClass::Flexibility),
      Category::seed("Other", "figure.mixed.cardio", ActivityClass::Other),
    ]
  }

  pub fn met(&self) -> f64 {
    self.activity_class.met()
  }

  /// kcal = MET * body weight (kg) * hours
  pub fn estimated_calories(&self, weight_kg: f64, duration_min: f64) -> Option<f64> {
    if weight_kg <= 0.0 || duration_min <= 0.0 {
      return None;
    }
    Some(self.met() * weight_kg * (duration_min / 60.0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_have_unique_names() {
    let categories = Category::defaults();
    let mut names: Vec<_> = categories.iter().map(|c| c.name.clone()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), categories.len());
  }

  #[test]
  fn test_activity_class_round_trips_through_str() {
    for category in Category::defaults() {
      let class = category.activity_class;
      assert_eq!(ActivityClass::parse(class.as_str()), Some(class));
    }
    assert_eq!(ActivityClass::parse("curling"), None);
  }

  #[test]
  fn test_estimated_calories() {
    let running = Category::seed("Running", "figure.run", ActivityClass::Running);
    // 9.8 MET * 70kg * 0.5h = 343 kcal
    let kcal = running.estimated_calories(70.0, 30.0).unwrap();
    assert!((kcal - 343.0).abs() < 1e-9);

    assert_eq!(running.estimated_calories(70.0, 0.0), None);
    assert_eq!(running.estimated_calories(-1.0, 30.0), None);
  }
}
