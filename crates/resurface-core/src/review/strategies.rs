//! Auxiliary resurfacing strategies: on-this-day, time travel and random pick.
//!
//! These read paths share the memo snapshot with the daily review but never
//! touch the session cache.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ResurfaceError, ResurfaceResult};
use crate::traits::MemoStore;
use crate::types::{Memo, MemoFilter, UserId};

/// Page size used when the caller does not provide one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Length of a randomly chosen time-travel window.
pub const TIME_TRAVEL_WINDOW_DAYS: i64 = 7;

/// Offset pagination as received from callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    /// Page size; values `<= 0` use [`DEFAULT_PAGE_SIZE`].
    pub page_size: i32,
    /// Items to skip; negative values are treated as zero.
    pub offset: i32,
}

impl Page {
    pub fn new(page_size: i32, offset: i32) -> Self {
        Self { page_size, offset }
    }

    /// Slice `items` to this page, clamping to the available range.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let page_size = if self.page_size > 0 {
            self.page_size as usize
        } else {
            DEFAULT_PAGE_SIZE
        };
        let offset = (self.offset.max(0) as usize).min(items.len());
        items.into_iter().skip(offset).take(page_size).collect()
    }
}

/// Memos from one past year in an on-this-day result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnThisDayGroup {
    pub year: i32,
    pub memos: Vec<Memo>,
}

/// On-this-day result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnThisDayResult {
    /// Groups ordered by year, newest first.
    pub groups: Vec<OnThisDayGroup>,
    /// Matching memos before pagination.
    pub total_count: usize,
}

/// Anniversary recall.
///
/// Selects memos created on `month`/`day` of any year other than the current
/// one, newest year first and newest memo first within a year, then pages
/// over the flattened list and regroups the page by year. Out-of-range
/// `month`/`day` values fall back to today's. Dates are evaluated in the
/// offset of `now`.
pub fn on_this_day(
    memos: Vec<Memo>,
    month: i32,
    day: i32,
    page: Page,
    now: DateTime<FixedOffset>,
) -> OnThisDayResult {
    let month = if (1..=12).contains(&month) {
        month as u32
    } else {
        now.month()
    };
    let day = if (1..=31).contains(&day) {
        day as u32
    } else {
        now.day()
    };
    let current_year = now.year();
    let offset = *now.offset();

    let mut matching: Vec<(i32, Memo)> = memos
        .into_iter()
        .filter_map(|memo| {
            let created = memo.created_at.with_timezone(&offset);
            (created.month() == month && created.day() == day && created.year() != current_year)
                .then(|| (created.year(), memo))
        })
        .collect();

    let total_count = matching.len();

    matching.sort_by(|(year_a, a), (year_b, b)| {
        year_b
            .cmp(year_a)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    let mut by_year: BTreeMap<i32, Vec<Memo>> = BTreeMap::new();
    for (year, memo) in page.apply(matching) {
        by_year.entry(year).or_default().push(memo);
    }

    let groups = by_year
        .into_iter()
        .rev()
        .map(|(year, memos)| OnThisDayGroup { year, memos })
        .collect();

    debug!(month, day, total_count, "Resolved on-this-day memos");

    OnThisDayResult {
        groups,
        total_count,
    }
}

/// Inclusive time range over memo creation timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimePeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ResurfaceResult<Self> {
        if start > end {
            return Err(ResurfaceError::validation_with_suggestion(
                "period start is after period end",
                "swap the period bounds",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Time-travel result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTravelResult {
    /// Memos in the period, newest first.
    pub memos: Vec<Memo>,
    pub period: TimePeriod,
    /// Memos in the period before pagination.
    pub total_count: usize,
}

/// Pick the time-travel period for a memo history.
///
/// Histories spanning less than a week use the whole span. Longer histories
/// get a uniformly random week starting in `[min, max - 7 days)`.
/// Returns `None` for an empty history.
pub fn resolve_period<R: Rng + ?Sized>(memos: &[Memo], rng: &mut R) -> Option<TimePeriod> {
    let min = memos.iter().map(|m| m.created_at).min()?;
    let max = memos.iter().map(|m| m.created_at).max()?;

    let window = Duration::days(TIME_TRAVEL_WINDOW_DAYS);
    let span = max.signed_duration_since(min);
    if span <= window {
        return Some(TimePeriod { start: min, end: max });
    }

    // Millisecond precision; a sub-millisecond excess still takes the whole span.
    let slack = (span - window).num_milliseconds();
    if slack <= 0 {
        return Some(TimePeriod { start: min, end: max });
    }
    let start = min + Duration::milliseconds(rng.gen_range(0..slack));
    Some(TimePeriod {
        start,
        end: start + window,
    })
}

/// Random time-window recall.
///
/// Uses `period` verbatim when provided. Fails with `NotFound` when the user
/// has no memos at all.
pub fn time_travel<R: Rng + ?Sized>(
    mut memos: Vec<Memo>,
    period: Option<TimePeriod>,
    page: Page,
    rng: &mut R,
) -> ResurfaceResult<TimeTravelResult> {
    if memos.is_empty() {
        return Err(ResurfaceError::no_memos());
    }

    let period = match period {
        Some(period) => period,
        None => resolve_period(&memos, rng).ok_or_else(ResurfaceError::no_memos)?,
    };

    memos.retain(|memo| period.contains(memo.created_at));
    memos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total_count = memos.len();

    debug!(
        start = %period.start,
        end = %period.end,
        total_count,
        "Resolved time-travel memos"
    );

    Ok(TimeTravelResult {
        memos: page.apply(memos),
        period,
        total_count,
    })
}

/// Single random pick among the user's normal memos.
pub fn random_pick(store: &dyn MemoStore, user_id: UserId) -> ResurfaceResult<Memo> {
    let filter = MemoFilter::snapshot(user_id).with_content().random_one();
    store
        .list_memos(&filter)?
        .into_iter()
        .next()
        .ok_or_else(ResurfaceError::no_memos)
}
