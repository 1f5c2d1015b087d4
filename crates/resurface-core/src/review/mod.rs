//! Review scheduling and resurfacing.
//!
//! - [`EligibilityPolicy`] decides when a memo may be shown again.
//! - [`CandidateScorer`] ranks eligible memos and picks a session.
//! - [`DailySessionCache`] keeps the day's session stable per user.
//! - [`strategies`] holds the on-this-day, time-travel and random paths.
//! - [`ReviewService`] wires them to storage.

mod cache;
mod eligibility;
mod scorer;
mod service;
pub mod strategies;

pub use cache::{CacheOutcome, DailyReviewEntry, DailySessionCache};
pub use eligibility::{EligibilityPolicy, SPACED_INTERVAL_DAYS};
pub use scorer::{
    CandidateScorer, ReviewSelection, MAX_AGE_BONUS, MAX_JITTER, MAX_OVERDUE_BONUS,
    NEVER_REVIEWED_BONUS, OVERDUE_RATIO_CAP,
};
pub use service::{completed_today, RecordedReviews, ReviewMemos, ReviewService, ReviewStats};
pub use strategies::{
    OnThisDayGroup, OnThisDayResult, Page, TimePeriod, TimeTravelResult, DEFAULT_PAGE_SIZE,
    TIME_TRAVEL_WINDOW_DAYS,
};
