//! Integration tests for the review engine over the SQLite store.
//!
//! Covers the daily session lifecycle, review recording and the
//! resurfacing strategies end to end.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use resurface_core::types::{
    MemoReview, MemoReviewFilter, MemoReviewSummary, NewMemoReview, NewReviewSession,
    ReviewSessionFilter,
};
use resurface_core::{
    CandidateScorer, EligibilityPolicy, MemoId, MemoStatus, NewMemo, Page, ResurfaceError, ResurfaceResult, ReviewLedger,
    ReviewService, ReviewSession, ReviewSource, SqliteStore, TimePeriod, UserId,
};

const USER: UserId = UserId(1);

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn seeded_store(count: i64) -> Arc<SqliteStore> {
    let store = SqliteStore::in_memory().unwrap();
    for i in 1..=count {
        store
            .create_memo(&NewMemo::new(
                USER,
                format!("memo number {}", i),
                now() - Duration::days(i * 3),
            ))
            .unwrap();
    }
    Arc::new(store)
}

fn service(store: &Arc<SqliteStore>) -> ReviewService {
    ReviewService::new(store.clone(), store.clone(), store.clone()).with_rng_seed(42)
}

fn ids(memos: &[resurface_core::Memo]) -> Vec<MemoId> {
    memos.iter().map(|m| m.id).collect()
}

/// Daily session: stable within the day, completed by a review, reset by force.
#[test]
fn test_daily_session_lifecycle() {
    let store = seeded_store(12);
    let svc = service(&store);

    let first = svc.list_review_memos(USER, false, now()).unwrap();
    assert_eq!(first.memos.len(), 10);
    assert_eq!(first.total_count, 12);
    assert!(!first.completed);
    assert!(first.memos.iter().all(|m| m.content.is_some()));

    let second = svc
        .list_review_memos(USER, false, now() + Duration::hours(6))
        .unwrap();
    assert_eq!(ids(&second.memos), ids(&first.memos));
    assert_eq!(second.total_count, 12);

    let names: Vec<String> = first.memos.iter().map(|m| m.name()).collect();
    let recorded = svc
        .record_review(USER, &names, ReviewSource::Review, now() + Duration::hours(7))
        .unwrap();
    assert_eq!(recorded.recorded_count, 10);
    assert!(recorded.session_id > 0);

    let after_review = svc
        .list_review_memos(USER, false, now() + Duration::hours(8))
        .unwrap();
    assert!(after_review.completed);
    assert_eq!(ids(&after_review.memos), ids(&first.memos));

    // Reviewed memos now rest for a day, so only the two leftovers remain.
    let forced = svc
        .list_review_memos(USER, true, now() + Duration::hours(9))
        .unwrap();
    assert!(!forced.completed);
    assert_eq!(forced.total_count, 2);
    assert!(forced.memos.iter().all(|m| !first.memos.contains(m)));
}

#[test]
fn test_next_day_regenerates_session() {
    let store = seeded_store(3);
    let svc = service(&store);

    let today = svc.list_review_memos(USER, false, now()).unwrap();
    let names: Vec<String> = today.memos.iter().map(|m| m.name()).collect();
    svc.record_review(USER, &names, ReviewSource::Review, now())
        .unwrap();
    assert!(svc.list_review_memos(USER, false, now()).unwrap().completed);

    let tomorrow = svc
        .list_review_memos(USER, false, now() + Duration::days(1))
        .unwrap();
    assert!(!tomorrow.completed);
    assert_eq!(tomorrow.total_count, 3);
}

#[test]
fn test_session_memo_count_exceeds_recorded_rows() {
    let store = seeded_store(2);
    let svc = service(&store);

    let submitted = vec![
        "memos/1".to_string(),
        "memos/not-a-number".to_string(),
        "1".to_string(),
        "memos/2".to_string(),
    ];
    let recorded = svc
        .record_review(USER, &submitted, ReviewSource::OnThisDay, now())
        .unwrap();
    assert_eq!(recorded.recorded_count, 2);

    let sessions = svc.list_review_sessions(USER, None, None).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].memo_count, 4);
    assert_eq!(sessions[0].source, ReviewSource::OnThisDay);

    let rows = store
        .list_memo_reviews(&MemoReviewFilter {
            user_id: Some(USER),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.session_id == Some(recorded.session_id)));
}

#[test]
fn test_completed_survives_restart() {
    let store = seeded_store(4);
    let svc = service(&store);
    let today = svc.list_review_memos(USER, false, now()).unwrap();
    svc.record_review(
        USER,
        &[today.memos[0].name()],
        ReviewSource::Review,
        now(),
    )
    .unwrap();

    let restarted = service(&store);
    let resumed = restarted
        .list_review_memos(USER, false, now() + Duration::hours(1))
        .unwrap();
    assert!(resumed.completed);
    assert_eq!(resumed.total_count, 3);
}

#[test]
fn test_stats_follow_eligibility() {
    let store = seeded_store(5);
    let svc = service(&store);
    svc.record_review(
        USER,
        &["memos/1".to_string(), "memos/2".to_string()],
        ReviewSource::Review,
        now() - Duration::hours(1),
    )
    .unwrap();
    store.set_memo_status(MemoId(5), MemoStatus::Archived).unwrap();

    let stats = svc.get_review_stats(USER, now()).unwrap();
    assert_eq!(stats.total_memos, 4);
    assert_eq!(stats.reviewed_last_30_days, 2);
    assert_eq!(stats.available_for_review, 2);
    assert_eq!(stats.total_sessions, 1);

    let later = svc.get_review_stats(USER, now() + Duration::days(2)).unwrap();
    assert_eq!(later.available_for_review, 4);
}

#[test]
fn test_include_tags_restrict_session() {
    let store = SqliteStore::in_memory().unwrap();
    for (i, tag) in ["work", "home", "work", "work/deep"].iter().enumerate() {
        store
            .create_memo(
                &NewMemo::new(USER, format!("m{}", i), now() - Duration::days(2)).with_tags([*tag]),
            )
            .unwrap();
    }
    let store = Arc::new(store);
    let svc = service(&store);
    svc.update_review_settings(
        USER,
        resurface_core::ReviewUserSetting {
            session_size: 5,
            include_tags: vec!["work".to_string()],
            exclude_tags: vec![],
        },
    )
    .unwrap();

    let session = svc.list_review_memos(USER, false, now()).unwrap();
    assert_eq!(session.total_count, 2);
    assert!(session.memos.iter().all(|m| m.tags == vec!["work".to_string()]));
}

#[test]
fn test_on_this_day_skips_current_year() {
    let store = SqliteStore::in_memory().unwrap();
    for year in [2025, 2024, 2022] {
        store
            .create_memo(&NewMemo::new(
                USER,
                format!("written in {}", year),
                Utc.with_ymd_and_hms(year, 6, 15, 9, 0, 0).unwrap(),
            ))
            .unwrap();
    }
    store
        .create_memo(&NewMemo::new(
            USER,
            "different day",
            Utc.with_ymd_and_hms(2024, 6, 16, 9, 0, 0).unwrap(),
        ))
        .unwrap();
    let store = Arc::new(store);
    let svc = service(&store);

    let result = svc
        .list_on_this_day(USER, 0, 0, Page::default(), now())
        .unwrap();
    assert_eq!(result.total_count, 2);
    let years: Vec<i32> = result.groups.iter().map(|g| g.year).collect();
    assert_eq!(years, vec![2024, 2022]);
    for group in &result.groups {
        for memo in &group.memos {
            assert_ne!(memo.created_at.year(), now().year());
        }
    }
}

#[test]
fn test_time_travel_short_history_spans_everything() {
    let store = SqliteStore::in_memory().unwrap();
    for hours in [0, 30, 100] {
        store
            .create_memo(&NewMemo::new(
                USER,
                "recent",
                now() - Duration::hours(hours),
            ))
            .unwrap();
    }
    let store = Arc::new(store);
    let svc = service(&store);

    let result = svc.get_time_travel(USER, None, Page::default()).unwrap();
    assert_eq!(result.total_count, 3);
    assert_eq!(result.period.start, now() - Duration::hours(100));
    assert_eq!(result.period.end, now());

    let narrowed = svc
        .get_time_travel(
            USER,
            Some(TimePeriod::new(now() - Duration::hours(40), now() - Duration::hours(1)).unwrap()),
            Page::default(),
        )
        .unwrap();
    assert_eq!(narrowed.total_count, 1);
}

#[test]
fn test_time_travel_and_random_pick_without_memos() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let svc = service(&store);

    assert!(svc
        .get_time_travel(USER, None, Page::default())
        .unwrap_err()
        .is_not_found());
    assert!(svc.get_random_memo(USER).unwrap_err().is_not_found());
}

#[test]
fn test_random_pick_ignores_archived() {
    let store = seeded_store(2);
    store.set_memo_status(MemoId(1), MemoStatus::Archived).unwrap();
    let svc = service(&store);

    for _ in 0..10 {
        assert_eq!(svc.get_random_memo(USER).unwrap().id, MemoId(2));
    }
}

#[test]
fn test_custom_policy_makes_reviewed_memos_due_again() {
    let store = seeded_store(3);
    let svc = service(&store).with_scorer(CandidateScorer::new(
        EligibilityPolicy::with_intervals(vec![0]).unwrap(),
    ));

    let today = svc.list_review_memos(USER, false, now()).unwrap();
    let names: Vec<String> = today.memos.iter().map(|m| m.name()).collect();
    svc.record_review(USER, &names, ReviewSource::Review, now())
        .unwrap();

    let forced = svc
        .list_review_memos(USER, true, now() + Duration::minutes(1))
        .unwrap();
    assert_eq!(forced.total_count, 3);
    assert_eq!(forced.memos.len(), 3);
}

#[test]
fn test_deleted_memo_drops_out_of_cached_session() {
    let store = seeded_store(3);
    let svc = service(&store);

    let first = svc.list_review_memos(USER, false, now()).unwrap();
    assert_eq!(first.memos.len(), 3);
    let gone = first.memos[0].id;
    assert!(store.delete_memo(gone).unwrap());
    assert!(!store.delete_memo(gone).unwrap());

    let again = svc
        .list_review_memos(USER, false, now() + Duration::hours(1))
        .unwrap();
    assert_eq!(again.memos.len(), 2);
    assert!(again.memos.iter().all(|m| m.id != gone));
    assert_eq!(again.total_count, 3);
}

/// Ledger whose every call fails, as a broken database would.
struct FailingLedger;

impl FailingLedger {
    fn fail<T>() -> ResurfaceResult<T> {
        Err(ResurfaceError::database("ledger unavailable"))
    }
}

impl ReviewLedger for FailingLedger {
    fn create_review_session(&self, _: &NewReviewSession) -> ResurfaceResult<ReviewSession> {
        Self::fail()
    }

    fn create_memo_review(&self, _: &NewMemoReview) -> ResurfaceResult<MemoReview> {
        Self::fail()
    }

    fn batch_create_memo_reviews(&self, _: &[NewMemoReview]) -> ResurfaceResult<usize> {
        Self::fail()
    }

    fn record_session(
        &self,
        _: &NewReviewSession,
        _: &[NewMemoReview],
    ) -> ResurfaceResult<(ReviewSession, usize)> {
        Self::fail()
    }

    fn list_review_sessions(&self, _: &ReviewSessionFilter) -> ResurfaceResult<Vec<ReviewSession>> {
        Self::fail()
    }

    fn list_memo_reviews(&self, _: &MemoReviewFilter) -> ResurfaceResult<Vec<MemoReview>> {
        Self::fail()
    }

    fn list_memo_review_summaries(&self, _: UserId) -> ResurfaceResult<Vec<MemoReviewSummary>> {
        Self::fail()
    }
}

#[test]
fn test_ledger_failures_propagate() {
    let store = seeded_store(3);
    let svc = ReviewService::new(store.clone(), Arc::new(FailingLedger), store.clone())
        .with_rng_seed(1);

    let err = svc.list_review_memos(USER, false, now()).unwrap_err();
    assert!(matches!(err, ResurfaceError::Database { .. }));
    // A failed population leaves nothing cached.
    assert!(svc.cache().peek(USER).is_none());

    let err = svc
        .record_review(USER, &["memos/1".to_string()], ReviewSource::Review, now())
        .unwrap_err();
    assert!(matches!(err, ResurfaceError::Database { .. }));

    assert!(svc.get_review_stats(USER, now()).is_err());

    // Empty submissions never reach the ledger.
    let noop = svc
        .record_review(USER, &[], ReviewSource::Review, now())
        .unwrap();
    assert_eq!(noop.session_id, 0);
}

/// Ledger over a real store whose session writes fail; everything else
/// passes through.
struct RejectingWrites(Arc<SqliteStore>);

impl ReviewLedger for RejectingWrites {
    fn create_review_session(&self, s: &NewReviewSession) -> ResurfaceResult<ReviewSession> {
        self.0.create_review_session(s)
    }

    fn create_memo_review(&self, r: &NewMemoReview) -> ResurfaceResult<MemoReview> {
        self.0.create_memo_review(r)
    }

    fn batch_create_memo_reviews(&self, _: &[NewMemoReview]) -> ResurfaceResult<usize> {
        Err(ResurfaceError::database("disk full"))
    }

    fn record_session(
        &self,
        _: &NewReviewSession,
        _: &[NewMemoReview],
    ) -> ResurfaceResult<(ReviewSession, usize)> {
        Err(ResurfaceError::database("disk full"))
    }

    fn list_review_sessions(&self, f: &ReviewSessionFilter) -> ResurfaceResult<Vec<ReviewSession>> {
        self.0.list_review_sessions(f)
    }

    fn list_memo_reviews(&self, f: &MemoReviewFilter) -> ResurfaceResult<Vec<MemoReview>> {
        self.0.list_memo_reviews(f)
    }

    fn list_memo_review_summaries(&self, u: UserId) -> ResurfaceResult<Vec<MemoReviewSummary>> {
        self.0.list_memo_review_summaries(u)
    }
}

#[test]
fn test_failed_record_leaves_no_session() {
    let store = seeded_store(3);
    let svc = ReviewService::new(
        store.clone(),
        Arc::new(RejectingWrites(store.clone())),
        store.clone(),
    )
    .with_rng_seed(1);

    assert!(svc
        .record_review(USER, &["memos/1".to_string()], ReviewSource::Review, now())
        .is_err());

    let fresh = service(&store);
    let today = fresh.list_review_memos(USER, false, now()).unwrap();
    assert!(!today.completed);
    assert_eq!(today.total_count, 3);

    let stats = fresh.get_review_stats(USER, now()).unwrap();
    assert_eq!(stats.total_sessions, 0);
    assert!(fresh.list_review_sessions(USER, None, None).unwrap().is_empty());
}
