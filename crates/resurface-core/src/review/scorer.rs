//! Candidate scoring and session selection.
//!
//! Every eligible memo gets a priority score:
//!
//! ```text
//! score = never_reviewed (50)
//!       + overdue        (0..=60, linear in (elapsed / interval - 1), capped at 5)
//!       + age            (0..=10, linear in age, capped at one year)
//!       + jitter         ([0, 10))
//! ```
//!
//! The top `session_size` memos are kept and then shuffled, so the caller
//! never sees them in score order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::eligibility::EligibilityPolicy;
use crate::types::{Memo, MemoId, MemoReviewSummary, ReviewUserSetting, DEFAULT_SESSION_SIZE};

/// Bonus for a memo that was never reviewed.
pub const NEVER_REVIEWED_BONUS: f64 = 50.0;
/// Maximum bonus for an overdue memo.
pub const MAX_OVERDUE_BONUS: f64 = 60.0;
/// Overdue ratio (beyond due) at which the overdue bonus saturates.
pub const OVERDUE_RATIO_CAP: f64 = 5.0;
/// Maximum bonus for memo age.
pub const MAX_AGE_BONUS: f64 = 10.0;
/// Upper (exclusive) bound of the random jitter.
pub const MAX_JITTER: f64 = 10.0;

const ONE_YEAR_SECONDS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Ordered memo ids for a session plus the number of eligible candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSelection {
    /// Selected ids in presentation order.
    pub memo_ids: Vec<MemoId>,
    /// Eligible candidates before truncation to the session size.
    pub total_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct ScoredMemo {
    memo_id: MemoId,
    score: f64,
}

/// Scores eligible memos and picks a review session.
#[derive(Debug, Clone)]
pub struct CandidateScorer {
    policy: EligibilityPolicy,
    default_session_size: u32,
}

impl CandidateScorer {
    /// Create a scorer over the given eligibility policy.
    pub fn new(policy: EligibilityPolicy) -> Self {
        Self {
            policy,
            default_session_size: DEFAULT_SESSION_SIZE,
        }
    }

    /// Override the session size used when the user's setting is `<= 0`.
    pub fn with_default_session_size(mut self, size: u32) -> Self {
        self.default_session_size = size.max(1);
        self
    }

    /// The eligibility policy in use.
    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Whether a memo passes the user's include/exclude tag filters.
    pub fn matches_tags(memo: &Memo, setting: &ReviewUserSetting) -> bool {
        if !setting.include_tags.is_empty() && !memo.has_any_tag(&setting.include_tags) {
            return false;
        }
        !memo.tags.iter().any(|tag| setting.is_tag_excluded(tag))
    }

    /// Deterministic part of the score (everything except jitter).
    pub fn base_score(
        &self,
        memo: &Memo,
        summary: Option<&MemoReviewSummary>,
        now: DateTime<Utc>,
    ) -> f64 {
        let mut score = 0.0;

        match summary {
            None => score += NEVER_REVIEWED_BONUS,
            Some(s) => {
                let interval = self.policy.required_interval(s.review_count);
                if interval > chrono::Duration::zero() {
                    let elapsed = now.signed_duration_since(s.last_reviewed_at);
                    let ratio = elapsed.num_milliseconds() as f64 / interval.num_milliseconds() as f64;
                    score += (ratio - 1.0).clamp(0.0, OVERDUE_RATIO_CAP) / OVERDUE_RATIO_CAP
                        * MAX_OVERDUE_BONUS;
                }
            }
        }

        let age_seconds = now.signed_duration_since(memo.created_at).num_seconds() as f64;
        score += (age_seconds / ONE_YEAR_SECONDS).clamp(0.0, 1.0) * MAX_AGE_BONUS;

        score
    }

    /// Pick a review session from a memo snapshot.
    ///
    /// `memos` must already be restricted to the user's normal memos.
    /// Never fails: an empty candidate set yields an empty selection.
    pub fn select<R: Rng + ?Sized>(
        &self,
        memos: &[Memo],
        summaries: &HashMap<MemoId, MemoReviewSummary>,
        setting: &ReviewUserSetting,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> ReviewSelection {
        let session_size = setting.effective_session_size(self.default_session_size);

        let mut candidates: Vec<ScoredMemo> = memos
            .iter()
            .filter(|memo| Self::matches_tags(memo, setting))
            .filter_map(|memo| {
                let summary = summaries.get(&memo.id);
                if !self.policy.is_eligible(summary, now) {
                    return None;
                }
                let jitter = rng.gen_range(0.0..MAX_JITTER);
                Some(ScoredMemo {
                    memo_id: memo.id,
                    score: self.base_score(memo, summary, now) + jitter,
                })
            })
            .collect();

        let total_count = candidates.len();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(session_size);
        candidates.shuffle(rng);

        debug!(
            snapshot = memos.len(),
            total_count,
            selected = candidates.len(),
            session_size,
            "Scored review candidates"
        );

        ReviewSelection {
            memo_ids: candidates.into_iter().map(|c| c.memo_id).collect(),
            total_count,
        }
    }
}

impl Default for CandidateScorer {
    fn default() -> Self {
        Self::new(EligibilityPolicy::new())
    }
}
