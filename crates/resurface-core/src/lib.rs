//! resurface-core - Core library for resurface.
//!
//! This crate provides the review engine that brings past memos back to
//! their author: spaced-repetition daily sessions, anniversary recall,
//! random time travel and random picks, plus the SQLite store behind them.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use resurface_core::{ResurfaceConfig, ReviewService, SqliteStore, UserId};
//!
//! # fn main() -> resurface_core::ResurfaceResult<()> {
//! let config = ResurfaceConfig::from_env();
//! let store = Arc::new(SqliteStore::new(&config.database_path)?);
//! let service = ReviewService::from_config(&config, store.clone(), store.clone(), store)?;
//!
//! let today = service.list_review_memos(UserId(1), false, Utc::now())?;
//! println!("{} memos to review", today.memos.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod review;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::ResurfaceConfig;
pub use error::{ErrorCode, ResurfaceError, ResurfaceResult};
pub use review::{
    CandidateScorer, DailySessionCache, EligibilityPolicy, OnThisDayResult, Page, RecordedReviews,
    ReviewMemos, ReviewService, ReviewStats, TimePeriod, TimeTravelResult,
};
pub use store::SqliteStore;
pub use traits::{MemoStore, ReviewLedger, UserSettingStore};
pub use types::{
    parse_memo_name, Memo, MemoId, MemoStatus, NewMemo, ReviewSession, ReviewSource,
    ReviewUserSetting, UserId,
};
