//! Review orchestration.
//!
//! [`ReviewService`] ties the scorer, the daily cache and the resurfacing
//! strategies to the storage collaborators. Every operation is scoped to a
//! single user and takes the current instant explicitly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cache::{DailyReviewEntry, DailySessionCache};
use super::scorer::{CandidateScorer, ReviewSelection};
use super::strategies::{self, OnThisDayResult, Page, TimePeriod, TimeTravelResult};
use crate::config::ResurfaceConfig;
use crate::error::{ResurfaceError, ResurfaceResult};
use crate::traits::{MemoStore, ReviewLedger, UserSettingStore};
use crate::types::{
    parse_memo_name, Memo, MemoFilter, MemoId, MemoReviewSummary, MemoStatus, NewMemoReview,
    NewReviewSession, ReviewSession, ReviewSessionFilter, ReviewSource, ReviewUserSetting, UserId,
    MAX_SESSION_SIZE,
};

/// Today's review session, hydrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewMemos {
    pub memos: Vec<Memo>,
    /// Eligible candidates when the session was selected.
    pub total_count: usize,
    pub completed: bool,
}

/// Result of recording a batch of reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedReviews {
    /// Id of the created session, `0` when nothing was submitted.
    pub session_id: i32,
    pub recorded_count: usize,
}

/// Review counters for one user.
///
/// `reviewed_last_30_days` counts memos that are not yet due again under the
/// spaced-repetition policy. It is not a literal 30-day lookback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_memos: usize,
    pub reviewed_last_30_days: usize,
    pub available_for_review: usize,
    pub total_sessions: usize,
}

/// Whether a session completed at `completed_at` falls on `today` in `offset`.
pub fn completed_today(completed_at: DateTime<Utc>, today: NaiveDate, offset: FixedOffset) -> bool {
    completed_at.with_timezone(&offset).date_naive() == today
}

/// Memo resurfacing engine for many users.
pub struct ReviewService {
    memos: Arc<dyn MemoStore>,
    ledger: Arc<dyn ReviewLedger>,
    settings: Arc<dyn UserSettingStore>,
    cache: DailySessionCache,
    scorer: CandidateScorer,
    default_session_size: u32,
    offset: FixedOffset,
    rng: Mutex<StdRng>,
}

impl ReviewService {
    /// Create a service with UTC days and an entropy-seeded generator.
    pub fn new(
        memos: Arc<dyn MemoStore>,
        ledger: Arc<dyn ReviewLedger>,
        settings: Arc<dyn UserSettingStore>,
    ) -> Self {
        let scorer = CandidateScorer::default();
        Self {
            memos,
            ledger,
            settings,
            cache: DailySessionCache::new(),
            default_session_size: crate::types::DEFAULT_SESSION_SIZE,
            scorer,
            offset: Utc.fix(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a service from configuration.
    pub fn from_config(
        config: &ResurfaceConfig,
        memos: Arc<dyn MemoStore>,
        ledger: Arc<dyn ReviewLedger>,
        settings: Arc<dyn UserSettingStore>,
    ) -> ResurfaceResult<Self> {
        config.validate()?;
        let mut service = Self::new(memos, ledger, settings)
            .with_utc_offset(config.utc_offset()?)
            .with_default_session_size(config.default_session_size);
        if let Some(seed) = config.rng_seed {
            service = service.with_rng_seed(seed);
        }
        Ok(service)
    }

    /// Decide calendar days in `offset` instead of UTC.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Make all randomness reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_default_session_size(mut self, size: u32) -> Self {
        self.default_session_size = size.max(1);
        self.scorer = self.scorer.with_default_session_size(size);
        self
    }

    pub fn with_scorer(mut self, scorer: CandidateScorer) -> Self {
        self.scorer = scorer.with_default_session_size(self.default_session_size);
        self
    }

    /// The session cache shared by all users.
    pub fn cache(&self) -> &DailySessionCache {
        &self.cache
    }

    /// Calendar day of `now` in the configured offset.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn default_setting(&self) -> ReviewUserSetting {
        ReviewUserSetting {
            session_size: self.default_session_size as i32,
            ..Default::default()
        }
    }

    // =========================================================================
    // Daily review
    // =========================================================================

    /// Today's review session for `user_id`.
    ///
    /// Served from the cache while today's entry exists; otherwise (or with
    /// `force`) a new session is selected and cached. A forced refresh always
    /// starts uncompleted. A regular miss restores `completed` from the
    /// ledger so it survives a restart.
    pub fn list_review_memos(
        &self,
        user_id: UserId,
        force: bool,
        now: DateTime<Utc>,
    ) -> ResurfaceResult<ReviewMemos> {
        let today = self.today(now);

        let (entry, outcome) = self.cache.get_or_populate(user_id, today, force, |forced| {
            let selection = self.select_session(user_id, now)?;
            let mut entry = DailyReviewEntry::new(today, selection);
            if !forced {
                entry.completed = self.has_review_session_on(user_id, today)?;
            }
            Ok(entry)
        })?;

        let memos = self.hydrate(&entry.memo_ids)?;
        debug!(
            user_id = %user_id,
            outcome = ?outcome,
            returned = memos.len(),
            total_count = entry.total_count,
            "Listed review memos"
        );

        Ok(ReviewMemos {
            memos,
            total_count: entry.total_count,
            completed: entry.completed,
        })
    }

    fn select_session(&self, user_id: UserId, now: DateTime<Utc>) -> ResurfaceResult<ReviewSelection> {
        let setting = self
            .settings
            .get_review_setting(user_id)?
            .unwrap_or_else(|| self.default_setting());

        let filter = MemoFilter::snapshot(user_id).with_tags_any(setting.include_tags.clone());
        let memos = self.memos.list_memos(&filter)?;
        let summaries = self.summaries(user_id)?;

        let mut rng = self.rng();
        Ok(self
            .scorer
            .select(&memos, &summaries, &setting, now, &mut *rng))
    }

    fn summaries(&self, user_id: UserId) -> ResurfaceResult<HashMap<MemoId, MemoReviewSummary>> {
        Ok(self
            .ledger
            .list_memo_review_summaries(user_id)?
            .into_iter()
            .map(|s| (s.memo_id, s))
            .collect())
    }

    fn has_review_session_on(&self, user_id: UserId, today: NaiveDate) -> ResurfaceResult<bool> {
        let day_start = today
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| self.offset.from_local_datetime(&naive).single())
            .map(|start| start.with_timezone(&Utc));

        let filter = ReviewSessionFilter {
            user_id: Some(user_id),
            completed_after: day_start,
            source: Some(ReviewSource::Review),
            limit: None,
        };
        Ok(self
            .ledger
            .list_review_sessions(&filter)?
            .iter()
            .any(|session| completed_today(session.completed_at, today, self.offset)))
    }

    /// Load full memos for `ids` in order, skipping ones that are gone or no
    /// longer normal.
    fn hydrate(&self, ids: &[MemoId]) -> ResurfaceResult<Vec<Memo>> {
        let mut memos = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.memos.get_memo(id)? {
                Some(memo) if memo.status == MemoStatus::Normal => memos.push(memo),
                _ => debug!(memo_id = %id, "Skipping unavailable memo during hydration"),
            }
        }
        Ok(memos)
    }

    /// Record that `user_id` reviewed the named memos.
    ///
    /// The session's `memo_count` is the number of names submitted. Names
    /// that do not parse are skipped, so fewer reviews than that may be
    /// written. The session and its reviews are written atomically. Reviews
    /// from the daily session mark today's entry completed.
    pub fn record_review(
        &self,
        user_id: UserId,
        memo_names: &[String],
        source: ReviewSource,
        now: DateTime<Utc>,
    ) -> ResurfaceResult<RecordedReviews> {
        if memo_names.is_empty() {
            return Ok(RecordedReviews::default());
        }

        let reviews: Vec<NewMemoReview> = memo_names
            .iter()
            .filter_map(|name| match parse_memo_name(name) {
                Ok(memo_id) => Some(NewMemoReview {
                    user_id,
                    memo_id,
                    reviewed_at: now,
                    source,
                    session_id: None,
                }),
                Err(e) => {
                    debug!(name = %name, error = %e, "Skipping unparseable memo name");
                    None
                }
            })
            .collect();

        let (session, recorded_count) = self.ledger.record_session(
            &NewReviewSession {
                user_id,
                completed_at: now,
                memo_count: memo_names.len() as i32,
                source,
            },
            &reviews,
        )?;

        if source == ReviewSource::Review {
            self.cache.mark_completed(user_id);
        }

        info!(
            user_id = %user_id,
            session_id = session.id,
            source = %source,
            submitted = memo_names.len(),
            recorded_count,
            "Recorded review session"
        );

        Ok(RecordedReviews {
            session_id: session.id,
            recorded_count,
        })
    }

    /// Split the user's normal memos into due and not-yet-due.
    pub fn get_review_stats(&self, user_id: UserId, now: DateTime<Utc>) -> ResurfaceResult<ReviewStats> {
        let memos = self.memos.list_memos(&MemoFilter::snapshot(user_id))?;
        let summaries = self.summaries(user_id)?;
        let policy = self.scorer.policy();

        let available_for_review = memos
            .iter()
            .filter(|memo| policy.is_eligible(summaries.get(&memo.id), now))
            .count();

        let total_sessions = self
            .ledger
            .list_review_sessions(&ReviewSessionFilter {
                user_id: Some(user_id),
                ..Default::default()
            })?
            .len();

        Ok(ReviewStats {
            total_memos: memos.len(),
            reviewed_last_30_days: memos.len() - available_for_review,
            available_for_review,
            total_sessions,
        })
    }

    // =========================================================================
    // Resurfacing strategies
    // =========================================================================

    /// Memos created on `month`/`day` in past years.
    pub fn list_on_this_day(
        &self,
        user_id: UserId,
        month: i32,
        day: i32,
        page: Page,
        now: DateTime<Utc>,
    ) -> ResurfaceResult<OnThisDayResult> {
        let memos = self
            .memos
            .list_memos(&MemoFilter::snapshot(user_id).with_content())?;
        Ok(strategies::on_this_day(
            memos,
            month,
            day,
            page,
            now.with_timezone(&self.offset),
        ))
    }

    /// Memos from `period`, or from a random week of the user's history.
    pub fn get_time_travel(
        &self,
        user_id: UserId,
        period: Option<TimePeriod>,
        page: Page,
    ) -> ResurfaceResult<TimeTravelResult> {
        let memos = self
            .memos
            .list_memos(&MemoFilter::snapshot(user_id).with_content())?;
        let mut rng = self.rng();
        strategies::time_travel(memos, period, page, &mut *rng)
    }

    /// One random normal memo.
    pub fn get_random_memo(&self, user_id: UserId) -> ResurfaceResult<Memo> {
        strategies::random_pick(self.memos.as_ref(), user_id)
    }

    // =========================================================================
    // Settings and history
    // =========================================================================

    /// Stored review setting, or the defaults.
    pub fn get_review_settings(&self, user_id: UserId) -> ResurfaceResult<ReviewUserSetting> {
        Ok(self
            .settings
            .get_review_setting(user_id)?
            .unwrap_or_else(|| self.default_setting()))
    }

    /// Validate and save a review setting.
    ///
    /// Today's cached session is left as is; it changes on the next day or
    /// on a forced refresh.
    pub fn update_review_settings(
        &self,
        user_id: UserId,
        mut setting: ReviewUserSetting,
    ) -> ResurfaceResult<ReviewUserSetting> {
        if setting.session_size < 1 || setting.session_size > MAX_SESSION_SIZE as i32 {
            return Err(ResurfaceError::validation_with_suggestion(
                format!("session size out of range: {}", setting.session_size),
                format!("use a session size between 1 and {}", MAX_SESSION_SIZE),
            ));
        }

        for tags in [&mut setting.include_tags, &mut setting.exclude_tags] {
            tags.iter_mut().for_each(|t| *t = t.trim().to_string());
            tags.retain(|t| !t.is_empty());
            tags.dedup();
        }

        self.settings.upsert_review_setting(user_id, &setting)?;
        info!(user_id = %user_id, session_size = setting.session_size, "Updated review settings");
        Ok(setting)
    }

    /// The user's review sessions, newest first.
    pub fn list_review_sessions(
        &self,
        user_id: UserId,
        source: Option<ReviewSource>,
        limit: Option<usize>,
    ) -> ResurfaceResult<Vec<ReviewSession>> {
        self.ledger.list_review_sessions(&ReviewSessionFilter {
            user_id: Some(user_id),
            completed_after: None,
            source,
            limit,
        })
    }
}
