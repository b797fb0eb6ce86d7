//! Handlers for onboarding profile data.
//!
//! Levels arrive as free-form strings (clients may still send the legacy
//! display labels) and go through the normalizer here, so everything past
//! this boundary carries the typed CEFR code.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use lingochat_core::level;
use lingochat_core::profile::{self, ProfileDraft};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Profile fields as clients send them. The level is free-form; everything
/// else mirrors [`ProfileDraft`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileDraftRequest {
    pub name: Option<String>,
    pub proficiency_level: Option<String>,
    pub target_language: Option<String>,
    pub learning_goals: Vec<String>,
    pub preferred_topics: Vec<String>,
    pub daily_goal_minutes: Option<i32>,
}

impl ProfileDraftRequest {
    /// Normalize into the typed domain draft. Unknown level input falls back
    /// to `a1` with a logged warning (never a request failure).
    pub fn into_draft(self) -> ProfileDraft {
        let proficiency_level = self.proficiency_level.as_deref().map(|raw| {
            let (level, warning) = level::normalize(raw);
            if let Some(w) = warning {
                tracing::warn!(input = %w.input, "Unrecognized proficiency level; defaulting to a1");
            }
            level
        });

        ProfileDraft {
            name: profile::decode_name(self.name),
            proficiency_level,
            target_language: self.target_language,
            learning_goals: self.learning_goals,
            preferred_topics: self.preferred_topics,
            daily_goal_minutes: self.daily_goal_minutes,
        }
        .decoded()
    }
}

/// GET /api/v1/onboarding
///
/// The stored profile plus whether onboarding is complete.
pub async fn get_onboarding(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let status = state.service.load_profile(&user.uid, None).await?;
    Ok(Json(DataResponse { data: status }))
}

/// PUT /api/v1/onboarding
///
/// Merge-save the supplied profile fields. Re-saving identical data is a
/// no-op beyond the `updated_at` stamp.
pub async fn save_onboarding(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ProfileDraftRequest>,
) -> AppResult<impl IntoResponse> {
    let status = state
        .service
        .save_profile(&user.uid, input.into_draft())
        .await?;

    tracing::info!(
        uid = %user.uid,
        is_complete = status.is_complete,
        "Onboarding profile saved",
    );

    Ok(Json(DataResponse { data: status }))
}
