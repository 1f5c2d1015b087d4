//! Daily review endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use resurface_core::types::DEFAULT_SESSION_SIZE;
use resurface_core::{ReviewSession, ReviewSource, ReviewStats, ReviewUserSetting};
use serde::{Deserialize, Serialize};

use super::{memo_responses, MemoResponse};
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Query parameters for the daily review.
#[derive(Debug, Default, Deserialize)]
pub struct ListReviewMemosQuery {
    /// Discard today's session and select a new one.
    #[serde(default)]
    pub force: bool,
}

/// Response for the daily review.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewMemosResponse {
    pub memos: Vec<MemoResponse>,
    pub total_count: usize,
    pub completed: bool,
}

/// Today's review session.
/// GET /api/v1/review/memos
pub async fn list_review_memos(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListReviewMemosQuery>,
) -> ApiResult<Json<ListReviewMemosResponse>> {
    let result = state
        .run(move |svc| svc.list_review_memos(user_id, query.force, Utc::now()))
        .await?;

    Ok(Json(ListReviewMemosResponse {
        memos: memo_responses(result.memos),
        total_count: result.total_count,
        completed: result.completed,
    }))
}

/// Request body for recording reviews.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReviewRequest {
    /// Memo resource names (`memos/{id}`).
    #[serde(default)]
    pub memo_names: Vec<String>,
    #[serde(default)]
    pub source: ReviewSource,
}

/// Response for recording reviews.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReviewResponse {
    pub session_id: i32,
    pub recorded_count: usize,
}

/// Record reviewed memos.
/// POST /api/v1/review/records
pub async fn record_review(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<RecordReviewRequest>,
) -> ApiResult<Json<RecordReviewResponse>> {
    let recorded = state
        .run(move |svc| {
            svc.record_review(user_id, &request.memo_names, request.source, Utc::now())
        })
        .await?;

    Ok(Json(RecordReviewResponse {
        session_id: recorded.session_id,
        recorded_count: recorded.recorded_count,
    }))
}

/// Review counters.
/// GET /api/v1/review/stats
pub async fn get_review_stats(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<ReviewStats>> {
    let stats = state
        .run(move |svc| svc.get_review_stats(user_id, Utc::now()))
        .await?;
    Ok(Json(stats))
}

/// Current review settings.
/// GET /api/v1/review/settings
pub async fn get_review_settings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<ReviewUserSetting>> {
    let setting = state
        .run(move |svc| svc.get_review_settings(user_id))
        .await?;
    Ok(Json(setting))
}

/// Request body for updating review settings. Missing fields use defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewSettingsRequest {
    #[serde(default = "default_session_size")]
    pub session_size: i32,
    #[serde(default)]
    pub include_tags: Vec<String>,
    #[serde(default)]
    pub exclude_tags: Vec<String>,
}

fn default_session_size() -> i32 {
    DEFAULT_SESSION_SIZE as i32
}

/// Replace review settings.
/// PUT /api/v1/review/settings
pub async fn update_review_settings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<UpdateReviewSettingsRequest>,
) -> ApiResult<Json<ReviewUserSetting>> {
    let setting = ReviewUserSetting {
        session_size: request.session_size,
        include_tags: request.include_tags,
        exclude_tags: request.exclude_tags,
    };
    let saved = state
        .run(move |svc| svc.update_review_settings(user_id, setting))
        .await?;
    Ok(Json(saved))
}

/// Query parameters for review history.
#[derive(Debug, Default, Deserialize)]
pub struct ListReviewSessionsQuery {
    pub source: Option<ReviewSource>,
    pub limit: Option<usize>,
}

/// Response for review history.
#[derive(Debug, Serialize)]
pub struct ListReviewSessionsResponse {
    pub sessions: Vec<ReviewSession>,
}

/// Past review sessions, newest first.
/// GET /api/v1/review/sessions
pub async fn list_review_sessions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListReviewSessionsQuery>,
) -> ApiResult<Json<ListReviewSessionsResponse>> {
    let sessions = state
        .run(move |svc| svc.list_review_sessions(user_id, query.source, query.limit))
        .await?;
    Ok(Json(ListReviewSessionsResponse { sessions }))
}
