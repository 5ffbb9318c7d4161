//! SQLite persistence for workout aggregates.
//!
//! The analytics modules never touch the database. Callers load an
//! aggregate here, mutate it in memory, then commit it back with one of the
//! transactional writers below. A failed commit leaves the in-memory values
//! intact so the commit can simply be retried.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::analysis::{HrZone, TrailingPolicy, UserSettings};
use crate::models::{ActivityClass, Category, Exercise, History, SplitTime, Workout};

pub type DbPool = SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Corrupt row: {0}")]
  Corrupt(String),
}

/// ---------------------------------------------------------------------------
/// Pool Setup
/// ---------------------------------------------------------------------------

/// Open the connection pool, run migrations and seed reference data
pub async fn initialize_db(database_url: &str) -> Result<DbPool, StoreError> {
  tracing::info!(url = database_url, "initializing database");

  // An in-memory database only exists per connection
  let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect(database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;
  seed_categories(&pool).await?;

  tracing::info!("database initialized");
  Ok(pool)
}

/// ---------------------------------------------------------------------------
/// Categories
/// ---------------------------------------------------------------------------

pub async fn seed_categories(pool: &DbPool) -> Result<(), StoreError> {
  let mut tx = pool.begin().await?;
  for category in Category::defaults() {
    sqlx::query("INSERT OR IGNORE INTO categories (name, symbol, activity_class) VALUES (?1, ?2, ?3)")
      .bind(&category.name)
      .bind(&category.symbol)
      .bind(category.activity_class.as_str())
      .execute(&mut *tx)
      .await?;
  }
  tx.commit().await?;
  Ok(())
}

pub async fn load_categories(pool: &DbPool) -> Result<Vec<Category>, StoreError> {
  let rows: Vec<(String, String, String)> =
    sqlx::query_as("SELECT name, symbol, activity_class FROM categories ORDER BY name")
      .fetch_all(pool)
      .await?;

  rows
    .into_iter()
    .map(|(name, symbol, class)| {
      let activity_class = ActivityClass::parse(&class)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown activity class '{}'", class)))?;
      Ok(Category {
        name,
        symbol,
        activity_class,
      })
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Row Types
/// ---------------------------------------------------------------------------

#[derive(Debug, FromRow)]
struct WorkoutRow {
  id: String,
  owner_id: String,
  title: String,
  rounds_enabled: bool,
  rounds_quantity: i64,
  fastest_time: Option<f64>,
  generated_summary: Option<String>,
  category_name: Option<String>,
}

#[derive(Debug, FromRow)]
struct ExerciseRow {
  id: String,
  name: String,
  sort_order: i64,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
  id: String,
  date: DateTime<Utc>,
  exercises_completed_json: String,
  last_session_duration: f64,
  intensity_score: Option<f64>,
  progress_pulse_score: Option<f64>,
  dominant_zone: Option<i64>,
}

#[derive(Debug, FromRow)]
struct SplitRow {
  id: String,
  history_id: Option<String>,
  exercise_id: Option<String>,
  duration_in_seconds: f64,
  sort_order: i64,
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
  Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad id '{}': {}", raw, e)))
}

fn parse_optional_id(raw: Option<String>) -> Result<Option<Uuid>, StoreError> {
  raw.as_deref().map(parse_id).transpose()
}

/// ---------------------------------------------------------------------------
/// Workout Aggregate
/// ---------------------------------------------------------------------------

/// Write a whole workout aggregate (exercises, history, splits) in one transaction
pub async fn save_workout(pool: &DbPool, workout: &Workout) -> Result<(), StoreError> {
  let workout_id = workout.id.to_string();
  let mut tx = pool.begin().await?;

  sqlx::query(
    r#"
    INSERT INTO workouts (
      id, owner_id, title, rounds_enabled, rounds_quantity,
      fastest_time, generated_summary, category_name
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(id) DO UPDATE SET
      owner_id = excluded.owner_id,
      title = excluded.title,
      rounds_enabled = excluded.rounds_enabled,
      rounds_quantity = excluded.rounds_quantity,
      fastest_time = excluded.fastest_time,
      generated_summary = excluded.generated_summary,
      category_name = excluded.category_name,
      updated_at = CURRENT_TIMESTAMP
    "#,
  )
  .bind(&workout_id)
  .bind(&workout.owner_id)
  .bind(&workout.title)
  .bind(workout.rounds_enabled)
  .bind(workout.rounds_quantity.max(1) as i64)
  .bind(workout.fastest_time)
  .bind(&workout.generated_summary)
  .bind(&workout.category)
  .execute(&mut *tx)
  .await?;

  // Children are replaced wholesale; history deletion cascades to splits
  sqlx::query("DELETE FROM exercises WHERE workout_id = ?1")
    .bind(&workout_id)
    .execute(&mut *tx)
    .await?;
  sqlx::query("DELETE FROM history WHERE workout_id = ?1")
    .bind(&workout_id)
    .execute(&mut *tx)
    .await?;

  for (position, exercise) in workout.exercises.iter().enumerate() {
    sqlx::query(
      "INSERT INTO exercises (id, workout_id, name, sort_order, position) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(exercise.id.to_string())
    .bind(&workout_id)
    .bind(&exercise.name)
    .bind(exercise.order)
    .bind(position as i64)
    .execute(&mut *tx)
    .await?;
  }

  for (position, entry) in workout.history.iter().enumerate() {
    let completed_json = serde_json::to_string(&entry.exercises_completed)
      .map_err(|e| StoreError::Corrupt(format!("unserializable exercises: {}", e)))?;

    sqlx::query(
      r#"
      INSERT INTO history (
        id, workout_id, date, exercises_completed_json, last_session_duration,
        intensity_score, progress_pulse_score, dominant_zone, position
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
      "#,
    )
    .bind(entry.id.to_string())
    .bind(&workout_id)
    .bind(entry.date)
    .bind(completed_json)
    .bind(entry.last_session_duration)
    .bind(entry.intensity_score)
    .bind(entry.progress_pulse_score)
    .bind(entry.dominant_zone.map(|z| z.number() as i64))
    .bind(position as i64)
    .execute(&mut *tx)
    .await?;

    for (split_position, split) in entry.split_times.iter().enumerate() {
      sqlx::query(
        r#"
        INSERT INTO split_times (
          id, owner_history_id, history_id, exercise_id,
          duration_in_seconds, sort_order, position
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
      )
      .bind(split.id.to_string())
      .bind(entry.id.to_string())
      .bind(split.history_id.map(|id| id.to_string()))
      .bind(split.exercise_id.map(|id| id.to_string()))
      .bind(split.duration_in_seconds)
      .bind(split.order)
      .bind(split_position as i64)
      .execute(&mut *tx)
      .await?;
    }
  }

  tx.commit().await?;
  tracing::debug!(workout = %workout.id, "saved workout aggregate");
  Ok(())
}

async fn hydrate(pool: &DbPool, row: WorkoutRow) -> Result<Workout, StoreError> {
  let exercise_rows: Vec<ExerciseRow> = sqlx::query_as(
    "SELECT id, name, sort_order FROM exercises WHERE workout_id = ?1 ORDER BY position",
  )
  .bind(&row.id)
  .fetch_all(pool)
  .await?;

  let exercises = exercise_rows
    .into_iter()
    .map(|e| {
      Ok(Exercise {
        id: parse_id(&e.id)?,
        name: e.name,
        order: e.sort_order,
      })
    })
    .collect::<Result<Vec<_>, StoreError>>()?;

  let history_rows: Vec<HistoryRow> = sqlx::query_as(
    r#"
    SELECT id, date, exercises_completed_json, last_session_duration,
           intensity_score, progress_pulse_score, dominant_zone
    FROM history
    WHERE workout_id = ?1
    ORDER BY position
    "#,
  )
  .bind(&row.id)
  .fetch_all(pool)
  .await?;

  let mut history = Vec::with_capacity(history_rows.len());
  for h in history_rows {
    let split_rows: Vec<SplitRow> = sqlx::query_as(
      r#"
      SELECT id, history_id, exercise_id, duration_in_seconds, sort_order
      FROM split_times
      WHERE owner_history_id = ?1
      ORDER BY position
      "#,
    )
    .bind(&h.id)
    .fetch_all(pool)
    .await?;

    let split_times = split_rows
      .into_iter()
      .map(|s| {
        Ok(SplitTime {
          id: parse_id(&s.id)?,
          duration_in_seconds: s.duration_in_seconds,
          order: s.sort_order,
          exercise_id: parse_optional_id(s.exercise_id)?,
          history_id: parse_optional_id(s.history_id)?,
        })
      })
      .collect::<Result<Vec<_>, StoreError>>()?;

    let dominant_zone = match h.dominant_zone {
      Some(n) => Some(
        HrZone::from_number(n)
          .ok_or_else(|| StoreError::Corrupt(format!("dominant zone {} out of range", n)))?,
      ),
      None => None,
    };

    let exercises_completed: Vec<Exercise> = serde_json::from_str(&h.exercises_completed_json)
      .map_err(|e| StoreError::Corrupt(format!("history {}: {}", h.id, e)))?;

    history.push(History {
      id: parse_id(&h.id)?,
      date: h.date,
      exercises_completed,
      last_session_duration: h.last_session_duration,
      intensity_score: h.intensity_score,
      progress_pulse_score: h.progress_pulse_score,
      dominant_zone,
      split_times,
    });
  }

  let rounds_quantity = u32::try_from(row.rounds_quantity.max(1)).map_err(|_| {
    StoreError::Corrupt(format!("rounds quantity {} out of range", row.rounds_quantity))
  })?;

  Ok(Workout {
    id: parse_id(&row.id)?,
    owner_id: row.owner_id,
    title: row.title,
    exercises,
    rounds_enabled: row.rounds_enabled,
    rounds_quantity,
    fastest_time: row.fastest_time,
    generated_summary: row.generated_summary,
    history,
    category: row.category_name,
  })
}

pub async fn load_workout(pool: &DbPool, id: Uuid) -> Result<Workout, StoreError> {
  let row: Option<WorkoutRow> = sqlx::query_as(
    r#"
    SELECT id, owner_id, title, rounds_enabled, rounds_quantity,
           fastest_time, generated_summary, category_name
    FROM workouts
    WHERE id = ?1
    "#,
  )
  .bind(id.to_string())
  .fetch_optional(pool)
  .await?;

  let row = row.ok_or_else(|| StoreError::NotFound(format!("workout {}", id)))?;
  hydrate(pool, row).await
}

pub async fn load_workouts_for_owner(pool: &DbPool, owner_id: &str) -> Result<Vec<Workout>, StoreError> {
  let rows: Vec<WorkoutRow> = sqlx::query_as(
    r#"
    SELECT id, owner_id, title, rounds_enabled, rounds_quantity,
           fastest_time, generated_summary, category_name
    FROM workouts
    WHERE owner_id = ?1
    ORDER BY title
    "#,
  )
  .bind(owner_id)
  .fetch_all(pool)
  .await?;

  let mut workouts = Vec::with_capacity(rows.len());
  for row in rows {
    workouts.push(hydrate(pool, row).await?);
  }
  Ok(workouts)
}

/// Delete a workout; exercises, history and splits cascade
pub async fn delete_workout(pool: &DbPool, id: Uuid) -> Result<(), StoreError> {
  let result = sqlx::query("DELETE FROM workouts WHERE id = ?1")
    .bind(id.to_string())
    .execute(pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(StoreError::NotFound(format!("workout {}", id)));
  }
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Derived Field Commits
/// ---------------------------------------------------------------------------

/// Persist the cached rollups (`fastest_time`, `generated_summary`)
pub async fn commit_rollups(pool: &DbPool, workout: &Workout) -> Result<(), StoreError> {
  let mut tx = pool.begin().await?;

  let result = sqlx::query(
    r#"
    UPDATE workouts SET
      fastest_time = ?1,
      generated_summary = ?2,
      updated_at = CURRENT_TIMESTAMP
    WHERE id = ?3
    "#,
  )
  .bind(workout.fastest_time)
  .bind(&workout.generated_summary)
  .bind(workout.id.to_string())
  .execute(&mut *tx)
  .await?;

  if result.rows_affected() == 0 {
    return Err(StoreError::NotFound(format!("workout {}", workout.id)));
  }

  tx.commit().await?;
  Ok(())
}

/// Persist the back-filled heart-rate scores of one session
pub async fn commit_scores(pool: &DbPool, entry: &History) -> Result<(), StoreError> {
  let mut tx = pool.begin().await?;

  let result = sqlx::query(
    r#"
    UPDATE history SET
      intensity_score = ?1,
      progress_pulse_score = ?2,
      dominant_zone = ?3
    WHERE id = ?4
    "#,
  )
  .bind(entry.intensity_score)
  .bind(entry.progress_pulse_score)
  .bind(entry.dominant_zone.map(|z| z.number() as i64))
  .bind(entry.id.to_string())
  .execute(&mut *tx)
  .await?;

  if result.rows_affected() == 0 {
    return Err(StoreError::NotFound(format!("history {}", entry.id)));
  }

  tx.commit().await?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// User Settings
/// ---------------------------------------------------------------------------

pub async fn get_user_settings(pool: &DbPool, owner_id: &str) -> Result<UserSettings, StoreError> {
  let row: Option<(Option<f64>, Option<f64>, Option<i64>, i64, String)> = sqlx::query_as(
    r#"
    SELECT resting_hr, max_hr, age, target_workouts_per_week, trailing_policy
    FROM user_settings
    WHERE owner_id = ?1
    "#,
  )
  .bind(owner_id)
  .fetch_optional(pool)
  .await?;

  match row {
    Some((resting_hr, max_hr, age, target, policy)) => Ok(UserSettings {
      resting_hr,
      max_hr,
      age,
      target_workouts_per_week: u32::try_from(target.max(0)).map_err(|_| {
        StoreError::Corrupt(format!("target workouts per week {} out of range", target))
      })?,
      trailing_policy: TrailingPolicy::parse(&policy)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown trailing policy '{}'", policy)))?,
    }),
    None => Ok(UserSettings::default()),
  }
}

/// Partial update; `None` keeps the stored value
pub async fn update_user_settings(
  pool: &DbPool,
  owner_id: &str,
  resting_hr: Option<f64>,
  max_hr: Option<f64>,
  age: Option<i64>,
  target_workouts_per_week: Option<u32>,
  trailing_policy: Option<TrailingPolicy>,
) -> Result<(), StoreError> {
  let mut tx = pool.begin().await?;

  sqlx::query("INSERT OR IGNORE INTO user_settings (owner_id) VALUES (?1)")
    .bind(owner_id)
    .execute(&mut *tx)
    .await?;

  sqlx::query(
    r#"
    UPDATE user_settings SET
      resting_hr = COALESCE(?1, resting_hr),
      max_hr = COALESCE(?2, max_hr),
      age = COALESCE(?3, age),
      target_workouts_per_week = COALESCE(?4, target_workouts_per_week),
      trailing_policy = COALESCE(?5, trailing_policy),
      updated_at = CURRENT_TIMESTAMP
    WHERE owner_id = ?6
    "#,
  )
  .bind(resting_hr)
  .bind(max_hr)
  .bind(age)
  .bind(target_workouts_per_week.map(|t| t as i64))
  .bind(trailing_policy.map(|p| p.as_str()))
  .bind(owner_id)
  .execute(&mut *tx)
  .await?;

  tx.commit().await?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
