//! The stored shapes: the per-user progress document, the merge-write patch,
//! and gem ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use lingochat_core::gems::GemBalance;
use lingochat_core::level::ProficiencyLevel;
use lingochat_core::profile::ProfileDraft;
use lingochat_core::streak::StreakCounters;
use lingochat_core::types::{CalendarDate, Timestamp};

/// One user's progress document. Created lazily on first write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub name: Option<String>,
    pub proficiency_level: Option<ProficiencyLevel>,
    pub target_language: Option<String>,
    pub learning_goals: Vec<String>,
    pub preferred_topics: Vec<String>,
    pub daily_goal_minutes: Option<i32>,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_login_days: i64,
    pub last_login_date: Option<CalendarDate>,
    pub gems: i64,
    pub total_gems_earned: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProgressRecord {
    /// A fresh record with zeroed counters, as lazily created by the store.
    pub fn new(now: DateTime<Utc>) -> Self {
        ProgressRecord {
            name: None,
            proficiency_level: None,
            target_language: None,
            learning_goals: Vec::new(),
            preferred_topics: Vec::new(),
            daily_goal_minutes: None,
            current_streak: 0,
            longest_streak: 0,
            total_login_days: 0,
            last_login_date: None,
            gems: 0,
            total_gems_earned: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The streak-related slice of this record.
    pub fn streak(&self) -> StreakCounters {
        StreakCounters {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            total_login_days: self.total_login_days,
            last_login_date: self.last_login_date,
        }
    }

    /// The gem-related slice of this record.
    pub fn balance(&self) -> GemBalance {
        GemBalance {
            gems: self.gems,
            total_gems_earned: self.total_gems_earned,
        }
    }

    /// The onboarding-profile slice of this record, sentinel-decoded.
    pub fn profile(&self) -> ProfileDraft {
        ProfileDraft {
            name: self.name.clone(),
            proficiency_level: self.proficiency_level,
            target_language: self.target_language.clone(),
            learning_goals: self.learning_goals.clone(),
            preferred_topics: self.preferred_topics.clone(),
            daily_goal_minutes: self.daily_goal_minutes,
        }
        .decoded()
    }
}

/// A merge-write against a [`ProgressRecord`]: `None` fields are left
/// untouched, `Some` fields overwrite. Streak counters and the gem balance
/// move as units so their internal invariants cannot be half-applied.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub proficiency_level: Option<ProficiencyLevel>,
    pub target_language: Option<String>,
    pub learning_goals: Option<Vec<String>>,
    pub preferred_topics: Option<Vec<String>>,
    pub daily_goal_minutes: Option<i32>,
    pub streak: Option<StreakCounters>,
    pub balance: Option<GemBalance>,
}

impl RecordPatch {
    /// Build a patch carrying the profile fields present in a draft.
    pub fn from_profile(draft: &ProfileDraft) -> Self {
        RecordPatch {
            name: draft.name.clone(),
            proficiency_level: draft.proficiency_level,
            target_language: draft.target_language.clone(),
            learning_goals: if draft.learning_goals.is_empty() {
                None
            } else {
                Some(draft.learning_goals.clone())
            },
            preferred_topics: if draft.preferred_topics.is_empty() {
                None
            } else {
                Some(draft.preferred_topics.clone())
            },
            daily_goal_minutes: draft.daily_goal_minutes,
            ..RecordPatch::default()
        }
    }

    /// True when the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.proficiency_level.is_none()
            && self.target_language.is_none()
            && self.learning_goals.is_none()
            && self.preferred_topics.is_none()
            && self.daily_goal_minutes.is_none()
            && self.streak.is_none()
            && self.balance.is_none()
    }

    /// Apply this patch to a record, stamping `updated_at`. Shared by the
    /// in-memory store; the Postgres store expresses the same merge in SQL.
    pub fn apply(self, record: &mut ProgressRecord, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            record.name = Some(name);
        }
        if let Some(level) = self.proficiency_level {
            record.proficiency_level = Some(level);
        }
        if let Some(lang) = self.target_language {
            record.target_language = Some(lang);
        }
        if let Some(goals) = self.learning_goals {
            record.learning_goals = goals;
        }
        if let Some(topics) = self.preferred_topics {
            record.preferred_topics = topics;
        }
        if let Some(minutes) = self.daily_goal_minutes {
            record.daily_goal_minutes = Some(minutes);
        }
        if let Some(streak) = self.streak {
            record.current_streak = streak.current_streak;
            record.longest_streak = streak.longest_streak;
            record.total_login_days = streak.total_login_days;
            record.last_login_date = streak.last_login_date;
        }
        if let Some(balance) = self.balance {
            record.gems = balance.gems;
            record.total_gems_earned = balance.total_gems_earned;
        }
        record.updated_at = now;
    }
}

/// One entry in a user's append-only gem ledger. Positive amounts are
/// earned, negative amounts are spent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GemTransaction {
    pub id: Uuid,
    pub amount: i64,
    pub reason: String,
    /// The balance immediately after this entry was applied.
    pub new_balance: i64,
    pub created_at: Timestamp,
}

/// A ledger entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewGemTransaction {
    pub amount: i64,
    pub reason: String,
    pub new_balance: i64,
}
