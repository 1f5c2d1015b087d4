//! On-this-day, time-travel and random-pick endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use resurface_core::{Page, TimePeriod};
use serde::{Deserialize, Serialize};

use super::{memo_responses, MemoResponse};
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Query parameters for on-this-day. Out-of-range dates mean today.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnThisDayQuery {
    #[serde(default)]
    pub month: i32,
    #[serde(default)]
    pub day: i32,
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub offset: i32,
}

#[derive(Debug, Serialize)]
pub struct YearGroupResponse {
    pub year: i32,
    pub memos: Vec<MemoResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnThisDayResponse {
    pub groups: Vec<YearGroupResponse>,
    pub total_count: usize,
}

/// Memos from this calendar day in past years.
/// GET /api/v1/memos/on-this-day
pub async fn list_on_this_day(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<OnThisDayQuery>,
) -> ApiResult<Json<OnThisDayResponse>> {
    let page = Page::new(query.page_size, query.offset);
    let result = state
        .run(move |svc| svc.list_on_this_day(user_id, query.month, query.day, page, Utc::now()))
        .await?;

    Ok(Json(OnThisDayResponse {
        groups: result
            .groups
            .into_iter()
            .map(|g| YearGroupResponse {
                year: g.year,
                memos: memo_responses(g.memos),
            })
            .collect(),
        total_count: result.total_count,
    }))
}

/// Query parameters for time travel. The period is used only when both
/// bounds are given.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTravelQuery {
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub offset: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTravelResponse {
    pub memos: Vec<MemoResponse>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_count: usize,
}

/// Memos from a week of the user's history.
/// GET /api/v1/memos/time-travel
pub async fn get_time_travel(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<TimeTravelQuery>,
) -> ApiResult<Json<TimeTravelResponse>> {
    let period = match (query.period_start, query.period_end) {
        (Some(start), Some(end)) => Some(TimePeriod::new(start, end)?),
        _ => None,
    };
    let page = Page::new(query.page_size, query.offset);

    let result = state
        .run(move |svc| svc.get_time_travel(user_id, period, page))
        .await?;

    Ok(Json(TimeTravelResponse {
        memos: memo_responses(result.memos),
        period_start: result.period.start,
        period_end: result.period.end,
        total_count: result.total_count,
    }))
}

/// One random memo.
/// GET /api/v1/memos/random
pub async fn get_random_memo(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<MemoResponse>> {
    let memo = state
        .run(move |svc| svc.get_random_memo(user_id))
        .await?;
    Ok(Json(memo.into()))
}
