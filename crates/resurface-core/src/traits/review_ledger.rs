//! Append-only review ledger.

use crate::error::ResurfaceResult;
use crate::types::{
    MemoReview, MemoReviewFilter, MemoReviewSummary, NewMemoReview, NewReviewSession,
    ReviewSession, ReviewSessionFilter, UserId,
};

/// Storage for review sessions and review events.
///
/// Rows are immutable once written. Summaries are always derived from the
/// stored events: `review_count` is the number of events for the memo and
/// `last_reviewed_at` the latest of their timestamps.
pub trait ReviewLedger: Send + Sync {
    /// Create a review session header.
    fn create_review_session(&self, session: &NewReviewSession) -> ResurfaceResult<ReviewSession>;

    /// Append a single review event.
    fn create_memo_review(&self, review: &NewMemoReview) -> ResurfaceResult<MemoReview>;

    /// Append several review events atomically. Returns the number written.
    fn batch_create_memo_reviews(&self, reviews: &[NewMemoReview]) -> ResurfaceResult<usize>;

    /// Create a session header together with its review events, all or
    /// nothing. Each review's `session_id` is set to the new session.
    /// Returns the session and the number of reviews written.
    fn record_session(
        &self,
        session: &NewReviewSession,
        reviews: &[NewMemoReview],
    ) -> ResurfaceResult<(ReviewSession, usize)>;

    /// List review sessions, newest first.
    fn list_review_sessions(&self, filter: &ReviewSessionFilter)
        -> ResurfaceResult<Vec<ReviewSession>>;

    /// List review events, newest first.
    fn list_memo_reviews(&self, filter: &MemoReviewFilter) -> ResurfaceResult<Vec<MemoReview>>;

    /// Aggregate the user's review events per memo.
    fn list_memo_review_summaries(&self, user_id: UserId)
        -> ResurfaceResult<Vec<MemoReviewSummary>>;
}
