//! Spaced-repetition eligibility.
//!
//! A memo that has been reviewed `n` times must rest for a fixed number of
//! days before it can be shown again. The interval table grows with `n` and
//! is clamped at its last entry.

use chrono::{DateTime, Duration, Utc};

use crate::error::{ResurfaceError, ResurfaceResult};
use crate::types::MemoReviewSummary;

/// Rest intervals in days, indexed by review count.
pub const SPACED_INTERVAL_DAYS: [i64; 6] = [0, 1, 3, 7, 14, 30];

/// Decides whether enough time has passed since a memo's last review.
///
/// The policy is a pure function of its inputs: the caller always supplies
/// `now`.
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    /// Strictly increasing rest intervals in days.
    intervals: Vec<i64>,
}

impl EligibilityPolicy {
    /// Create the policy with the standard interval table.
    pub fn new() -> Self {
        Self {
            intervals: SPACED_INTERVAL_DAYS.to_vec(),
        }
    }

    /// Create a policy with a custom interval table.
    ///
    /// The table must be non-empty, start at a non-negative value and be
    /// strictly increasing.
    pub fn with_intervals(intervals: Vec<i64>) -> ResurfaceResult<Self> {
        if intervals.is_empty() {
            return Err(ResurfaceError::validation("interval table must not be empty"));
        }
        if intervals[0] < 0 {
            return Err(ResurfaceError::validation("intervals must be non-negative"));
        }
        if intervals.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ResurfaceError::validation_with_suggestion(
                "interval table must be strictly increasing",
                "order the intervals from shortest to longest without duplicates",
            ));
        }
        Ok(Self { intervals })
    }

    /// Interval table in days.
    pub fn intervals(&self) -> &[i64] {
        &self.intervals
    }

    /// Minimum rest period after `review_count` reviews.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Duration;
    /// use resurface_core::review::EligibilityPolicy;
    ///
    /// let policy = EligibilityPolicy::new();
    /// assert_eq!(policy.required_interval(0), Duration::zero());
    /// assert_eq!(policy.required_interval(2), Duration::days(3));
    /// assert_eq!(policy.required_interval(99), Duration::days(30));
    /// ```
    pub fn required_interval(&self, review_count: u32) -> Duration {
        let idx = (review_count as usize).min(self.intervals.len() - 1);
        Duration::days(self.intervals[idx])
    }

    /// Whether a memo with the given summary may be reviewed at `now`.
    ///
    /// A memo that was never reviewed is always eligible.
    pub fn is_eligible(&self, summary: Option<&MemoReviewSummary>, now: DateTime<Utc>) -> bool {
        match summary {
            None => true,
            Some(s) => {
                now.signed_duration_since(s.last_reviewed_at)
                    >= self.required_interval(s.review_count)
            }
        }
    }
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::new()
    }
}
