//! Handlers for the gem ledger: awards, spends, review-session rewards, and
//! transaction history.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::service::DEFAULT_AWARD_REASON;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AwardRequest {
    pub amount: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpendRequest {
    pub amount: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteReviewRequest {
    pub card_count: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

/// POST /api/v1/gems/award
pub async fn award(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<AwardRequest>,
) -> AppResult<impl IntoResponse> {
    let reason = input.reason.as_deref().unwrap_or(DEFAULT_AWARD_REASON);
    let award = state
        .service
        .award_gems(&user.uid, input.amount, reason)
        .await?;

    tracing::info!(
        uid = %user.uid,
        amount = input.amount,
        reason,
        new_total = award.new_total,
        "Gems awarded",
    );

    Ok(Json(DataResponse { data: award }))
}

/// POST /api/v1/gems/spend
pub async fn spend(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SpendRequest>,
) -> AppResult<impl IntoResponse> {
    let reason = input.reason.as_deref().unwrap_or(DEFAULT_AWARD_REASON);
    let spend = state
        .service
        .spend_gems(&user.uid, input.amount, reason)
        .await?;

    Ok(Json(DataResponse { data: spend }))
}

/// POST /api/v1/reviews/complete
///
/// Award gems for a completed flashcard review session. The reward scales
/// with the card count and the user's current streak.
pub async fn complete_review(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CompleteReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let reward = state
        .service
        .complete_review(&user.uid, input.card_count)
        .await?;

    tracing::info!(
        uid = %user.uid,
        card_count = reward.card_count,
        gems_awarded = reward.gems_awarded,
        "Review session rewarded",
    );

    Ok(Json(DataResponse { data: reward }))
}

/// GET /api/v1/gems/transactions?limit=
///
/// Recent ledger entries, newest first.
pub async fn transactions(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> AppResult<impl IntoResponse> {
    let transactions = state
        .service
        .recent_transactions(&user.uid, query.limit)
        .await?;
    Ok(Json(DataResponse { data: transactions }))
}
