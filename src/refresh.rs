//! Per-user heart-rate refresh with supersede semantics
//!
//! At most one sample fetch is in flight per user. A newer request for the
//! same user aborts the older one instead of queueing behind it, since the
//! data is always wanted "as of now". Requests for different users never
//! touch each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

use crate::analysis::HrSample;
use crate::samples::{HeartRateSource, SampleError};

struct InFlight {
  generation: u64,
  handle: AbortHandle,
}

type InFlightMap = Mutex<HashMap<String, InFlight>>;

fn lock(in_flight: &InFlightMap) -> MutexGuard<'_, HashMap<String, InFlight>> {
  // The map stays consistent even if a holder panicked
  in_flight.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns one fetch's slot. Dropping it aborts the task and frees the slot
/// if no newer fetch has taken it, including when the caller is cancelled.
struct SlotGuard<'a> {
  in_flight: &'a InFlightMap,
  user_id: &'a str,
  generation: u64,
  handle: AbortHandle,
}

impl Drop for SlotGuard<'_> {
  fn drop(&mut self) {
    // No-op once the task has finished
    self.handle.abort();

    let mut in_flight = lock(self.in_flight);
    if in_flight
      .get(self.user_id)
      .is_some_and(|f| f.generation == self.generation)
    {
      in_flight.remove(self.user_id);
    }
  }
}

pub struct RefreshCoordinator<S> {
  source: Arc<S>,
  in_flight: InFlightMap,
  next_generation: AtomicU64,
}

impl<S> RefreshCoordinator<S>
where
  S: HeartRateSource + 'static,
{
  pub fn new(source: S) -> Self {
    Self {
      source: Arc::new(source),
      in_flight: Mutex::new(HashMap::new()),
      next_generation: AtomicU64::new(0),
    }
  }

  /// Whether a fetch for this user is currently running
  pub fn is_in_flight(&self, user_id: &str) -> bool {
    lock(&self.in_flight).contains_key(user_id)
  }

  /// Fetch samples for `[start, end)`, cancelling any older fetch for `user_id`.
  ///
  /// Resolves `Err(SampleError::Superseded)` if a newer fetch for the same
  /// user arrives before this one completes. Dropping the returned future
  /// aborts the underlying request.
  pub async fn fetch(
    &self,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<HrSample>, SampleError> {
    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
    let source = Arc::clone(&self.source);
    let task = tokio::spawn(async move { source.fetch_heart_rate(start, end).await });

    let _slot = SlotGuard {
      in_flight: &self.in_flight,
      user_id,
      generation,
      handle: task.abort_handle(),
    };

    let previous = lock(&self.in_flight).insert(
      user_id.to_string(),
      InFlight {
        generation,
        handle: task.abort_handle(),
      },
    );
    if let Some(previous) = previous {
      tracing::debug!(user_id, "aborting superseded heart rate refresh");
      previous.handle.abort();
    }

    match task.await {
      Ok(result) => result,
      Err(e) if e.is_cancelled() => {
        tracing::info!(user_id, "heart rate refresh superseded by a newer request");
        Err(SampleError::Superseded)
      }
      Err(e) => Err(SampleError::Task(e.to_string())),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
