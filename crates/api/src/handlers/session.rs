//! Handlers for session-start reconciliation and progress snapshots.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use lingochat_core::types::CalendarDate;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::handlers::onboarding::ProfileDraftRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for POST /session/start. Both fields are optional; an empty object
/// is a plain "I signed in" ping.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartSessionRequest {
    /// The client's local calendar day. Streaks follow the user's wall
    /// clock; the server only falls back to UTC when this is absent.
    pub local_date: Option<CalendarDate>,
    /// A locally cached onboarding draft to merge into the loaded profile
    /// (e.g., a name typed before authentication completed).
    pub profile_draft: Option<ProfileDraftRequest>,
}

/// POST /api/v1/session/start
///
/// The sign-in reconciliation: loads (or lazily creates) the progress
/// record, updates the login streak for today, and returns the full
/// snapshot.
pub async fn start(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StartSessionRequest>,
) -> AppResult<impl IntoResponse> {
    let today = input
        .local_date
        .unwrap_or_else(|| Utc::now().date_naive());
    let draft = input.profile_draft.map(ProfileDraftRequest::into_draft);

    let session = state.service.start_session(&user.uid, today, draft).await?;

    tracing::info!(
        uid = %user.uid,
        %today,
        current_streak = session.snapshot.current_streak,
        counted = session.streak_counted,
        persisted = session.persisted,
        "Session started",
    );

    Ok(Json(DataResponse { data: session }))
}

/// GET /api/v1/progress
///
/// Current snapshot without touching the streak.
pub async fn progress(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.service.get_progress(&user.uid).await?;
    Ok(Json(DataResponse { data: snapshot }))
}
