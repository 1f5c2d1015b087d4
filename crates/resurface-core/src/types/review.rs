//! Review ledger types and per-user review settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::memo::{MemoId, UserId};

/// Default number of memos in a daily review session.
pub const DEFAULT_SESSION_SIZE: u32 = 10;

/// Largest session size a user may configure.
pub const MAX_SESSION_SIZE: u32 = 100;

/// Which resurfacing path produced a recorded review.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewSource {
    /// The daily spaced-repetition session.
    #[default]
    Review,
    /// Anniversary recall.
    OnThisDay,
    /// Single random pick.
    Surprise,
    /// Random time-window recall.
    TimeTravel,
}

/// Header row of one recorded batch of reviews. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
    pub id: i32,
    pub user_id: UserId,
    pub completed_at: DateTime<Utc>,
    /// Number of memo names submitted, which may exceed the reviews recorded.
    pub memo_count: i32,
    pub source: ReviewSource,
}

/// Data required to create a review session.
#[derive(Debug, Clone)]
pub struct NewReviewSession {
    pub user_id: UserId,
    pub completed_at: DateTime<Utc>,
    pub memo_count: i32,
    pub source: ReviewSource,
}

/// One review event of one memo. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoReview {
    pub id: i32,
    pub user_id: UserId,
    pub memo_id: MemoId,
    pub reviewed_at: DateTime<Utc>,
    pub source: ReviewSource,
    pub session_id: Option<i32>,
}

/// Data required to append a review event.
#[derive(Debug, Clone)]
pub struct NewMemoReview {
    pub user_id: UserId,
    pub memo_id: MemoId,
    pub reviewed_at: DateTime<Utc>,
    pub source: ReviewSource,
    pub session_id: Option<i32>,
}

/// Per (user, memo) aggregate derived from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoReviewSummary {
    pub memo_id: MemoId,
    pub review_count: u32,
    pub last_reviewed_at: DateTime<Utc>,
}

/// Query over review sessions. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct ReviewSessionFilter {
    pub user_id: Option<UserId>,
    /// Inclusive lower bound on `completed_at`.
    pub completed_after: Option<DateTime<Utc>>,
    pub source: Option<ReviewSource>,
    pub limit: Option<usize>,
}

/// Query over individual review events. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct MemoReviewFilter {
    pub user_id: Option<UserId>,
    pub memo_id: Option<MemoId>,
    /// Inclusive lower bound on `reviewed_at`.
    pub reviewed_after: Option<DateTime<Utc>>,
    pub source: Option<ReviewSource>,
    pub limit: Option<usize>,
}

/// User preferences that shape the daily review session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewUserSetting {
    /// Desired session size; values `<= 0` fall back to the default.
    pub session_size: i32,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
}

impl Default for ReviewUserSetting {
    fn default() -> Self {
        Self {
            session_size: DEFAULT_SESSION_SIZE as i32,
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
        }
    }
}

impl ReviewUserSetting {
    /// Session size to use, substituting `default` for non-positive values.
    pub fn effective_session_size(&self, default: u32) -> usize {
        if self.session_size > 0 {
            self.session_size as usize
        } else {
            default as usize
        }
    }

    /// Whether a memo tag is excluded by this setting.
    ///
    /// An exclude tag matches the memo tag itself and anything it prefixes,
    /// so `project` also excludes `project/sub`.
    pub fn is_tag_excluded(&self, memo_tag: &str) -> bool {
        self.exclude_tags
            .iter()
            .any(|exclude| memo_tag == exclude || memo_tag.starts_with(exclude.as_str()))
    }
}
