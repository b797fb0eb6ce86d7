//! Onboarding profile data: sentinel decoding, draft merging, and the
//! completion check.
//!
//! Legacy records used the literal name `"User"` as a "not yet set" marker.
//! Internally the name is a proper `Option`; [`decode_name`] is the single
//! place that knows about the sentinel, applied wherever raw strings enter.

use serde::{Deserialize, Serialize};

use crate::level::ProficiencyLevel;

/// The magic string legacy records stored before a name was chosen.
pub const LEGACY_NAME_SENTINEL: &str = "User";

/// Onboarding profile fields. Every field is optional; a draft may come from
/// the remote record, from a locally cached pre-auth draft, or from a merge
/// of the two.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub proficiency_level: Option<ProficiencyLevel>,
    pub target_language: Option<String>,
    pub learning_goals: Vec<String>,
    pub preferred_topics: Vec<String>,
    pub daily_goal_minutes: Option<i32>,
}

impl ProfileDraft {
    /// Decode legacy sentinel and empty-string values into proper absent
    /// fields.
    pub fn decoded(mut self) -> ProfileDraft {
        self.name = decode_name(self.name);
        self.target_language = self
            .target_language
            .filter(|lang| !lang.trim().is_empty());
        self
    }

    /// Whether onboarding is complete: a real (non-sentinel) name and a
    /// proficiency level. Nothing else is required.
    pub fn is_complete(&self) -> bool {
        decode_name(self.name.clone()).is_some() && self.proficiency_level.is_some()
    }
}

/// Turn a raw name into its decoded form: trimmed, with empty strings and
/// the legacy sentinel mapped to `None`.
pub fn decode_name(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == LEGACY_NAME_SENTINEL {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Merge a remote record with a locally cached draft, field-wise.
///
/// Remote is the source of truth once it has real data: a remote value wins
/// unless it is absent (sentinels having already been decoded to `None`), in
/// which case the local draft fills the gap.
pub fn merge(remote: ProfileDraft, local: ProfileDraft) -> ProfileDraft {
    let remote = remote.decoded();
    let local = local.decoded();

    ProfileDraft {
        name: remote.name.or(local.name),
        proficiency_level: remote.proficiency_level.or(local.proficiency_level),
        target_language: remote.target_language.or(local.target_language),
        learning_goals: if remote.learning_goals.is_empty() {
            local.learning_goals
        } else {
            remote.learning_goals
        },
        preferred_topics: if remote.preferred_topics.is_empty() {
            local.preferred_topics
        } else {
            remote.preferred_topics
        },
        daily_goal_minutes: remote.daily_goal_minutes.or(local.daily_goal_minutes),
    }
}
