//! Gem (reward-point) accounting.
//!
//! Pure arithmetic over a user's balance. The ledger itself (the append-only
//! transaction log) lives behind the persistence port; this module only
//! guarantees the balance invariants: `gems >= 0` and
//! `total_gems_earned >= gems`, with `total_gems_earned` non-decreasing.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Flat gem rate per reviewed flashcard.
pub const BASE_RATE_PER_CARD: i64 = 5;
/// A streak-loyalty bonus gem per card is added for every full week of streak.
pub const STREAK_MILESTONE_DAYS: i64 = 7;
/// Every completed review session awards at least this many gems.
pub const REWARD_FLOOR: i64 = 5;
/// Upper bound on cards counted in a single review session.
pub const MAX_CARDS_PER_SESSION: i64 = 1_000;

/// The gem-related slice of a user's progress record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemBalance {
    /// Spendable/displayable balance.
    pub gems: i64,
    /// Lifetime earned total; never decreases.
    pub total_gems_earned: i64,
}

impl GemBalance {
    /// Add a positive award to both the balance and the lifetime total.
    /// Amounts are client-supplied, so an award that would overflow either
    /// counter is rejected rather than wrapped.
    pub fn apply_award(self, amount: i64) -> Result<GemBalance, CoreError> {
        if amount <= 0 {
            return Err(CoreError::Validation(format!(
                "Gem award must be positive, got {amount}"
            )));
        }
        let gems = self.gems.checked_add(amount);
        let total_gems_earned = self.total_gems_earned.checked_add(amount);
        match (gems, total_gems_earned) {
            (Some(gems), Some(total_gems_earned)) => Ok(GemBalance {
                gems,
                total_gems_earned,
            }),
            _ => Err(CoreError::Validation(format!(
                "Gem award of {amount} overflows the balance"
            ))),
        }
    }

    /// Deduct a positive amount from the balance. The lifetime total is
    /// untouched; spending never exceeds the current balance.
    pub fn apply_spend(self, amount: i64) -> Result<GemBalance, CoreError> {
        if amount <= 0 {
            return Err(CoreError::Validation(format!(
                "Gem spend must be positive, got {amount}"
            )));
        }
        if amount > self.gems {
            return Err(CoreError::Validation(format!(
                "Insufficient gems: balance is {}, tried to spend {amount}",
                self.gems
            )));
        }
        Ok(GemBalance {
            gems: self.gems - amount,
            ..self
        })
    }
}

/// Gems awarded for completing a flashcard review session.
///
/// Flat base rate per reviewed card, plus one bonus gem per card for each
/// full 7-day streak milestone, floored so every completed session feels
/// rewarded.
pub fn calculate_reward(card_count: i64, streak: i64) -> i64 {
    // Saturating so absurd inputs clamp instead of wrapping; callers bound
    // card_count at MAX_CARDS_PER_SESSION anyway.
    let base = card_count.saturating_mul(BASE_RATE_PER_CARD);
    let bonus = card_count.saturating_mul(streak.max(0) / STREAK_MILESTONE_DAYS);
    base.saturating_add(bonus).max(REWARD_FLOOR)
}
