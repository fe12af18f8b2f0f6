//! Offloaded, cancellable duplicate scanning.
//!
//! The full pairwise scan is quadratic and must not block event
//! processing, so it runs on the blocking pool over an immutable snapshot
//! and delivers its result as a single value. Cancellation is cooperative:
//! the token is checked before the scan starts and once per outer-loop
//! row, which bounds the latency of a cancel to one row's comparisons.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use folk_core::matcher::{Match, MatchValues};
use tokio::task::JoinHandle;

use crate::{Error, Result};

// ─── Cancellation ────────────────────────────────────────────────────────────

/// Shared cancel flag for a background scan.
///
/// Created by the caller and handed to [`spawn_scan`], so a scan can be
/// cancelled at any point of its lifecycle — including before the worker
/// has been scheduled (engine teardown mid-startup).
#[derive(Debug, Clone, Default)]
pub struct ScanToken {
  flag: Arc<AtomicBool>,
}

impl ScanToken {
  pub fn new() -> Self { Self::default() }

  pub fn cancel(&self) {
    self.flag.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.flag.load(Ordering::Relaxed)
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Handle on a background duplicate scan.
pub struct ScanHandle<K> {
  token: ScanToken,
  join:  JoinHandle<Option<Vec<Match<K>>>>,
}

impl<K> ScanHandle<K> {
  /// Request cancellation; the running scan stops at the next row boundary.
  pub fn cancel(&self) {
    self.token.cancel();
  }

  /// Await the scan. `Ok(Some(matches))` is the single "matches ready"
  /// result; `Ok(None)` means the scan was cancelled.
  pub async fn join(self) -> Result<Option<Vec<Match<K>>>> {
    self
      .join
      .await
      .map_err(|e| Error::ScanAborted(e.to_string()))
  }
}

// ─── Spawn ───────────────────────────────────────────────────────────────────

/// Run the full pairwise scan over `entries` on the blocking pool.
///
/// Takes a snapshot (see `Aggregator::match_entries`) rather than the live
/// collection, so the engine is free to keep mutating while the scan runs.
/// A token cancelled before the worker runs yields `None` without doing
/// any comparison work.
pub fn spawn_scan<K>(
  entries: Vec<(K, MatchValues)>,
  token: ScanToken,
) -> ScanHandle<K>
where
  K: Clone + Send + 'static,
{
  let worker_token = token.clone();

  let join = tokio::task::spawn_blocking(move || {
    if worker_token.is_cancelled() {
      return None;
    }

    let mut matches = Vec::new();
    for (i, (key, values)) in entries.iter().enumerate() {
      if worker_token.is_cancelled() {
        return None;
      }
      for (earlier_key, earlier_values) in &entries[..i] {
        let fields = earlier_values.matched_fields(values);
        if !fields.is_empty() {
          matches.push(Match {
            fields,
            first: earlier_key.clone(),
            second: key.clone(),
          });
        }
      }
    }
    Some(matches)
  });

  ScanHandle { token, join }
}
