//! Per-user daily review session cache.
//!
//! Keeps the day's selection stable across repeated requests. An entry is
//! served only on the calendar day it was created for and only while it
//! holds at least one memo; anything else is a miss and gets overwritten.
//! There is no eviction.
//!
//! Each user has a slot with its own lock. The hit test and any write that
//! follows it run under that lock, so concurrent requests for the same user
//! cannot both regenerate and race their writes. Requests for different
//! users never wait on each other beyond the brief slot lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::scorer::ReviewSelection;
use crate::error::ResurfaceResult;
use crate::types::{MemoId, UserId};

/// Cached review session for one user and one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReviewEntry {
    /// Day this entry was generated for (`YYYY-MM-DD`).
    pub date: NaiveDate,
    pub memo_ids: Vec<MemoId>,
    pub total_count: usize,
    pub completed: bool,
}

impl DailyReviewEntry {
    /// Build an uncompleted entry from a fresh selection.
    pub fn new(date: NaiveDate, selection: ReviewSelection) -> Self {
        Self {
            date,
            memo_ids: selection.memo_ids,
            total_count: selection.total_count,
            completed: false,
        }
    }

    /// Whether this entry may be served on `today`.
    pub fn is_hit(&self, today: NaiveDate) -> bool {
        self.date == today && !self.memo_ids.is_empty()
    }
}

/// How [`DailySessionCache::get_or_populate`] resolved a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Refreshed,
}

type Slot = Arc<Mutex<Option<DailyReviewEntry>>>;

/// Concurrency-safe cache of daily review sessions keyed by user.
#[derive(Debug, Default)]
pub struct DailySessionCache {
    slots: Mutex<HashMap<UserId, Slot>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Review cache lock was poisoned; continuing with last written state");
        poisoned.into_inner()
    })
}

impl DailySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: UserId) -> Slot {
        let mut slots = lock(&self.slots);
        slots.entry(user_id).or_default().clone()
    }

    /// Return the user's entry if it is a hit for `today`.
    pub fn get(&self, user_id: UserId, today: NaiveDate) -> Option<DailyReviewEntry> {
        let slot = self.slot(user_id);
        let guard = lock(&slot);
        guard.as_ref().filter(|entry| entry.is_hit(today)).cloned()
    }

    /// Store an entry unconditionally, replacing any previous one.
    pub fn put(&self, user_id: UserId, entry: DailyReviewEntry) {
        let slot = self.slot(user_id);
        *lock(&slot) = Some(entry);
    }

    /// Mark the user's current entry completed. No-op if there is none.
    ///
    /// Returns whether an entry was marked.
    pub fn mark_completed(&self, user_id: UserId) -> bool {
        let slot = self.slot(user_id);
        let mut guard = lock(&slot);
        match guard.as_mut() {
            Some(entry) => {
                entry.completed = true;
                true
            }
            None => false,
        }
    }

    /// Serve today's entry or build and store a new one, atomically per user.
    ///
    /// With `force`, the stored entry is ignored and always replaced. The
    /// `populate` closure runs while the user's slot is locked; it receives
    /// whether this is a forced refresh.
    pub fn get_or_populate<F>(
        &self,
        user_id: UserId,
        today: NaiveDate,
        force: bool,
        populate: F,
    ) -> ResurfaceResult<(DailyReviewEntry, CacheOutcome)>
    where
        F: FnOnce(bool) -> ResurfaceResult<DailyReviewEntry>,
    {
        let slot = self.slot(user_id);
        let mut guard = lock(&slot);

        if !force {
            if let Some(entry) = guard.as_ref().filter(|entry| entry.is_hit(today)) {
                debug!(user_id = %user_id, date = %today, "Daily review cache hit");
                return Ok((entry.clone(), CacheOutcome::Hit));
            }
        }

        let entry = populate(force)?;
        *guard = Some(entry.clone());

        let outcome = if force {
            CacheOutcome::Refreshed
        } else {
            CacheOutcome::Miss
        };
        debug!(
            user_id = %user_id,
            date = %today,
            memo_count = entry.memo_ids.len(),
            outcome = ?outcome,
            "Daily review cache populated"
        );
        Ok((entry, outcome))
    }

    /// Raw stored entry for a user regardless of date.
    pub fn peek(&self, user_id: UserId) -> Option<DailyReviewEntry> {
        let slot = self.slot(user_id);
        let guard = lock(&slot);
        guard.clone()
    }
}
