//! Route definitions for the REST API.

mod health;
mod resurface;
mod review;

use axum::{
    routing::{get, post},
    Router,
};
use resurface_core::Memo;
use serde::Serialize;

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Daily review
        .route("/api/v1/review/memos", get(review::list_review_memos))
        .route("/api/v1/review/records", post(review::record_review))
        .route("/api/v1/review/stats", get(review::get_review_stats))
        .route(
            "/api/v1/review/settings",
            get(review::get_review_settings).put(review::update_review_settings),
        )
        .route("/api/v1/review/sessions", get(review::list_review_sessions))
        // Resurfacing
        .route("/api/v1/memos/on-this-day", get(resurface::list_on_this_day))
        .route("/api/v1/memos/time-travel", get(resurface::get_time_travel))
        .route("/api/v1/memos/random", get(resurface::get_random_memo))
        // Attach state
        .with_state(state)
}

/// A memo as returned by the API, addressed by its resource name.
#[derive(Debug, Serialize)]
pub struct MemoResponse {
    pub name: String,
    #[serde(flatten)]
    pub memo: Memo,
}

impl From<Memo> for MemoResponse {
    fn from(memo: Memo) -> Self {
        Self {
            name: memo.name(),
            memo,
        }
    }
}

pub(crate) fn memo_responses(memos: Vec<Memo>) -> Vec<MemoResponse> {
    memos.into_iter().map(Into::into).collect()
}

pub use health::*;
pub use resurface::*;
pub use review::*;
