//! Expansion of a workout template into the segments a user performs.

use crate::models::{Exercise, Workout};

/// Exercises ordered by `order`, ties keeping definition order.
pub fn sorted_exercises(workout: &Workout) -> Vec<Exercise> {
  let mut exercises = workout.exercises.clone();
  // sort_by_key is stable
  exercises.sort_by_key(|e| e.order);
  exercises
}

/// The ordered sequence to execute, repeated once per round.
pub fn effective_sequence(workout: &Workout) -> Vec<Exercise> {
  let round = sorted_exercises(workout);
  let rounds = workout.rounds_multiplier() as usize;
  if rounds <= 1 || round.is_empty() {
    return round;
  }

  let mut sequence = Vec::with_capacity(round.len() * rounds);
  for _ in 0..rounds {
    sequence.extend(round.iter().cloned());
  }
  sequence
}

/// Comma-joined names of one round, in execution order
pub fn exercise_names(workout: &Workout) -> String {
  sorted_exercises(workout)
    .iter()
    .map(|e| e.name.as_str())
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn names(sequence: &[Exercise]) -> Vec<&str> {
    sequence.iter().map(|e| e.name.as_str()).collect()
  }

  fn workout_with(exercises: &[(&str, i64)]) -> Workout {
    let mut workout = Workout::new("user-1", "Circuit");
    workout.exercises = exercises
      .iter()
      .map(|(name, order)| Exercise::new(*name, *order))
      .collect();
    workout
  }

  #[test]
  fn test_sorted_by_order_when_rounds_disabled() {
    let mut workout = workout_with(&[("C", 5), ("A", 0), ("B", 2)]);
    workout.rounds_quantity = 3;

    let sequence = effective_sequence(&workout);
    assert_eq!(names(&sequence), vec!["A", "B", "C"]);
  }

  #[test]
  fn test_rounds_expansion_repeats_each_round_in_order() {
    let mut workout = workout_with(&[("B", 1), ("A", 0)]);
    workout.rounds_enabled = true;
    workout.rounds_quantity = 3;

    let sequence = effective_sequence(&workout);
    assert_eq!(names(&sequence), vec!["A", "B", "A", "B", "A", "B"]);
  }

  #[test]
  fn test_single_round_is_not_repeated() {
    let mut workout = workout_with(&[("A", 0), ("B", 1)]);
    workout.rounds_enabled = true;
    workout.rounds_quantity = 1;

    assert_eq!(names(&effective_sequence(&workout)), vec!["A", "B"]);
  }

  #[test]
  fn test_ties_keep_definition_order() {
    let workout = workout_with(&[("Plank", 1), ("Squat", 0), ("Lunge", 1), ("Burpee", 0)]);

    let sequence = effective_sequence(&workout);
    assert_eq!(names(&sequence), vec!["Squat", "Burpee", "Plank", "Lunge"]);
  }

  #[test]
  fn test_empty_exercise_list_stays_empty() {
    let mut workout = workout_with(&[]);
    workout.rounds_enabled = true;
    workout.rounds_quantity = 5;

    assert!(effective_sequence(&workout).is_empty());
  }

  #[test]
  fn test_sequence_is_rederivable() {
    let mut workout = workout_with(&[("A", 2), ("B", -1)]);
    workout.rounds_enabled = true;
    workout.rounds_quantity = 2;

    let first = effective_sequence(&workout);
    let second = effective_sequence(&workout);
    assert_eq!(first, second);
    // The stored exercise list is left as defined
    assert_eq!(workout.exercises[0].name, "A");
  }

  #[test]
  fn test_exercise_names_joined_in_order() {
    let workout = workout_with(&[("Row", 3), ("Squat", 1), ("Press", 2)]);
    assert_eq!(exercise_names(&workout), "Squat, Press, Row");
    assert_eq!(exercise_names(&workout_with(&[])), "");
  }
}
