//! Login-streak arithmetic on calendar-day granularity.
//!
//! All comparisons are between [`CalendarDate`]s; resolving "today" in the
//! user's timezone is the caller's responsibility (the API layer accepts the
//! client's local date and falls back to UTC).

use serde::{Deserialize, Serialize};

use crate::types::CalendarDate;

/// The streak-related slice of a user's progress record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakCounters {
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_login_days: i64,
    /// `None` means the user has never logged in.
    pub last_login_date: Option<CalendarDate>,
}

/// Outcome of applying one day's login to a set of counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub counters: StreakCounters,
    /// False when today's login was already recorded (same-day re-entry).
    pub counted: bool,
    /// True when the stored `last_login_date` was ahead of `today`. The
    /// counters are clamped to a fresh streak; callers should log this.
    pub anomaly: bool,
}

/// Apply a login on `today` to the given counters.
///
/// - Same day as the last login: no-op (idempotent re-entry).
/// - Last login was yesterday: the streak continues.
/// - Last login was 2+ days ago, or never: the streak restarts at 1.
/// - Last login is in the future (data anomaly): restart at 1, flag it.
///
/// `longest_streak` never decreases and `total_login_days` increments only
/// when the login was actually counted.
pub fn update(counters: StreakCounters, today: CalendarDate) -> StreakUpdate {
    if counters.last_login_date == Some(today) {
        return StreakUpdate {
            counters,
            counted: false,
            anomaly: false,
        };
    }

    let yesterday = today.pred_opt();
    let mut anomaly = false;

    let current_streak = match counters.last_login_date {
        None => 1,
        Some(last) if Some(last) == yesterday => counters.current_streak + 1,
        Some(last) if last < today => 1,
        Some(_) => {
            anomaly = true;
            1
        }
    };

    let counters = StreakCounters {
        current_streak,
        longest_streak: counters.longest_streak.max(current_streak),
        total_login_days: counters.total_login_days + 1,
        last_login_date: Some(today),
    };

    StreakUpdate {
        counters,
        counted: true,
        anomaly,
    }
}
