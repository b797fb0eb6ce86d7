//! The reconciler: orchestrates the pure domain logic against the
//! persistence port.
//!
//! On session start the flow is load -> streak update -> persist, with the
//! merged onboarding profile returned alongside the counters. Gem operations
//! write the balance first and append to the ledger afterwards; a ledger
//! failure is logged and isolated from the caller's result, so the ledger is
//! best-effort history while the balance is authoritative.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use lingochat_core::gems::{self, GemBalance};
use lingochat_core::profile::{self, ProfileDraft};
use lingochat_core::streak;
use lingochat_core::types::CalendarDate;
use lingochat_store::{
    GemTransaction, NewGemTransaction, ProgressRecord, ProgressStore, RecordPatch, StoreError,
};

use crate::error::AppResult;

/// Ledger reason recorded for review-session rewards.
pub const REVIEW_REWARD_REASON: &str = "flashcard_review";
/// Ledger reason used when the caller does not provide one.
pub const DEFAULT_AWARD_REASON: &str = "activity";

/// Everything the UI needs after a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub profile: ProfileDraft,
    pub is_onboarding_complete: bool,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_login_days: i64,
    pub last_login_date: Option<CalendarDate>,
    pub gems: i64,
    pub total_gems_earned: i64,
}

impl ProgressSnapshot {
    fn from_record(record: &ProgressRecord, local_draft: Option<ProfileDraft>) -> Self {
        let profile = match local_draft {
            Some(local) => profile::merge(record.profile(), local),
            None => record.profile(),
        };
        ProgressSnapshot {
            is_onboarding_complete: profile.is_complete(),
            profile,
            current_streak: record.current_streak,
            longest_streak: record.longest_streak,
            total_login_days: record.total_login_days,
            last_login_date: record.last_login_date,
            gems: record.gems,
            total_gems_earned: record.total_gems_earned,
        }
    }
}

/// Result of a session-start reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub snapshot: ProgressSnapshot,
    /// False when the streak write failed; the snapshot then shows the
    /// previously stored (stale-but-consistent) counters and the client
    /// should treat the update as not having happened.
    pub persisted: bool,
    /// False for a same-day re-entry (nothing to count).
    pub streak_counted: bool,
}

/// Stored profile plus completion status.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingStatus {
    pub profile: ProfileDraft,
    pub is_complete: bool,
}

/// Result of a gem award.
#[derive(Debug, Clone, Serialize)]
pub struct GemAward {
    pub gems_awarded: i64,
    pub new_total: i64,
    pub total_gems_earned: i64,
}

/// Result of a gem spend.
#[derive(Debug, Clone, Serialize)]
pub struct GemSpend {
    pub gems_spent: i64,
    pub new_total: i64,
}

/// Result of completing a flashcard review session.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReward {
    pub card_count: i64,
    pub streak: i64,
    pub gems_awarded: i64,
    pub new_total: i64,
}

/// The user-progress reconciliation service.
#[derive(Clone)]
pub struct ProgressService {
    store: Arc<dyn ProgressStore>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        ProgressService { store }
    }

    /// The sign-in reconciliation: load the record (defaulting when absent),
    /// apply today's login to the streak counters, persist, and return the
    /// snapshot with the optional locally cached draft merged in.
    ///
    /// A failed write after a successful load does not error out: the caller
    /// gets the previously stored counters with `persisted: false`.
    pub async fn start_session(
        &self,
        uid: &str,
        today: CalendarDate,
        draft: Option<ProfileDraft>,
    ) -> AppResult<SessionStart> {
        let base = match self.store.get_record(uid).await? {
            Some(record) => record,
            None => ProgressRecord::new(Utc::now()),
        };

        let update = streak::update(base.streak(), today);
        if update.anomaly {
            tracing::warn!(
                %uid,
                last_login_date = ?base.last_login_date,
                %today,
                "Stored last_login_date is in the future; streak reset to 1",
            );
        }

        if !update.counted {
            // Same-day re-entry: counters are already current.
            return Ok(SessionStart {
                snapshot: ProgressSnapshot::from_record(&base, draft),
                persisted: true,
                streak_counted: false,
            });
        }

        let patch = RecordPatch {
            streak: Some(update.counters),
            ..RecordPatch::default()
        };

        match self.store.put_record(uid, patch).await {
            Ok(saved) => Ok(SessionStart {
                snapshot: ProgressSnapshot::from_record(&saved, draft),
                persisted: true,
                streak_counted: true,
            }),
            Err(err) => {
                tracing::warn!(%uid, error = %err, "Streak update failed to persist; returning stale counters");
                Ok(SessionStart {
                    snapshot: ProgressSnapshot::from_record(&base, draft),
                    persisted: false,
                    streak_counted: false,
                })
            }
        }
    }

    /// Current snapshot. A user without a record yet gets zeroed counters
    /// and an empty profile, matching what the UI shows pre-onboarding.
    pub async fn get_progress(&self, uid: &str) -> AppResult<ProgressSnapshot> {
        let record = match self.store.get_record(uid).await? {
            Some(record) => record,
            None => ProgressRecord::new(Utc::now()),
        };
        Ok(ProgressSnapshot::from_record(&record, None))
    }

    /// Load the stored profile, merging in a locally cached draft when one
    /// is supplied. Remote wins unless its value is absent/sentinel.
    pub async fn load_profile(
        &self,
        uid: &str,
        draft: Option<ProfileDraft>,
    ) -> AppResult<OnboardingStatus> {
        let remote = match self.store.get_record(uid).await? {
            Some(record) => record.profile(),
            None => ProfileDraft::default(),
        };
        let profile = match draft {
            Some(local) => profile::merge(remote, local),
            None => remote,
        };
        Ok(OnboardingStatus {
            is_complete: profile.is_complete(),
            profile,
        })
    }

    /// Persist a profile draft. The level on the draft is already canonical
    /// (free-form input is normalized at the API boundary), so this is a
    /// plain merge-write; re-saving identical data changes nothing but
    /// `updated_at`.
    pub async fn save_profile(&self, uid: &str, draft: ProfileDraft) -> AppResult<OnboardingStatus> {
        let draft = draft.decoded();
        let saved = self
            .store
            .put_record(uid, RecordPatch::from_profile(&draft))
            .await?;
        let profile = saved.profile();
        Ok(OnboardingStatus {
            is_complete: profile.is_complete(),
            profile,
        })
    }

    /// Award gems. The balance write is authoritative; the ledger append is
    /// attempted afterwards and its failure never reaches the caller.
    pub async fn award_gems(&self, uid: &str, amount: i64, reason: &str) -> AppResult<GemAward> {
        let balance = self.current_balance(uid).await?;
        let updated = balance.apply_award(amount)?;

        let saved = self.put_balance(uid, updated).await?;
        self.append_ledger(uid, amount, reason, saved.gems).await;

        Ok(GemAward {
            gems_awarded: amount,
            new_total: saved.gems,
            total_gems_earned: saved.total_gems_earned,
        })
    }

    /// Spend gems. Fails on overdraft; the ledger entry carries a negative
    /// amount.
    pub async fn spend_gems(&self, uid: &str, amount: i64, reason: &str) -> AppResult<GemSpend> {
        let balance = self.current_balance(uid).await?;
        let updated = balance.apply_spend(amount)?;

        let saved = self.put_balance(uid, updated).await?;
        self.append_ledger(uid, -amount, reason, saved.gems).await;

        Ok(GemSpend {
            gems_spent: amount,
            new_total: saved.gems,
        })
    }

    /// Complete a flashcard review session: compute the reward from the card
    /// count and the current streak, then award it.
    pub async fn complete_review(&self, uid: &str, card_count: i64) -> AppResult<ReviewReward> {
        if !(1..=gems::MAX_CARDS_PER_SESSION).contains(&card_count) {
            return Err(lingochat_core::error::CoreError::Validation(format!(
                "card_count must be between 1 and {}, got {card_count}",
                gems::MAX_CARDS_PER_SESSION
            ))
            .into());
        }

        let streak = match self.store.get_record(uid).await? {
            Some(record) => record.current_streak,
            None => 0,
        };
        let reward = gems::calculate_reward(card_count, streak);
        let award = self.award_gems(uid, reward, REVIEW_REWARD_REASON).await?;

        Ok(ReviewReward {
            card_count,
            streak,
            gems_awarded: award.gems_awarded,
            new_total: award.new_total,
        })
    }

    /// The most recent ledger entries, newest first. `limit` is clamped to
    /// 1..=100 and defaults to 20.
    pub async fn recent_transactions(
        &self,
        uid: &str,
        limit: Option<i64>,
    ) -> AppResult<Vec<GemTransaction>> {
        let limit = limit.unwrap_or(20).clamp(1, 100);
        Ok(self.store.recent_transactions(uid, limit).await?)
    }

    /// Store connectivity probe for the health endpoint.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.health_check().await
    }

    async fn current_balance(&self, uid: &str) -> AppResult<GemBalance> {
        Ok(match self.store.get_record(uid).await? {
            Some(record) => record.balance(),
            None => GemBalance::default(),
        })
    }

    async fn put_balance(&self, uid: &str, balance: GemBalance) -> AppResult<ProgressRecord> {
        let patch = RecordPatch {
            balance: Some(balance),
            ..RecordPatch::default()
        };
        Ok(self.store.put_record(uid, patch).await?)
    }

    /// Best-effort ledger append with its own error channel: a failure here
    /// is logged and swallowed because the balance write already committed.
    async fn append_ledger(&self, uid: &str, amount: i64, reason: &str, new_balance: i64) {
        let entry = NewGemTransaction {
            amount,
            reason: reason.to_string(),
            new_balance,
        };
        if let Err(err) = self.store.append_transaction(uid, entry).await {
            tracing::warn!(
                %uid,
                amount,
                error = %err,
                "Gem transaction failed to append; balance update already committed",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};

    use lingochat_core::level::ProficiencyLevel;
    use lingochat_store::memory::MemoryStore;

    use super::*;
    use crate::error::AppError;

    fn service() -> ProgressService {
        ProgressService::new(Arc::new(MemoryStore::new()))
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn first_session_creates_the_record_with_first_login_defaults() {
        let service = service();

        let session = service
            .start_session("u1", day("2026-08-25"), None)
            .await
            .unwrap();

        assert!(session.persisted);
        assert!(session.streak_counted);
        assert_eq!(session.snapshot.current_streak, 1);
        assert_eq!(session.snapshot.longest_streak, 1);
        assert_eq!(session.snapshot.total_login_days, 1);
        assert_eq!(session.snapshot.gems, 0);
        assert!(!session.snapshot.is_onboarding_complete);
    }

    #[tokio::test]
    async fn same_day_second_session_changes_nothing() {
        let service = service();
        let today = day("2026-08-25");

        service.start_session("u1", today, None).await.unwrap();
        let second = service.start_session("u1", today, None).await.unwrap();

        assert!(!second.streak_counted);
        assert_eq!(second.snapshot.current_streak, 1);
        assert_eq!(second.snapshot.total_login_days, 1);
    }

    #[tokio::test]
    async fn consecutive_days_grow_the_streak() {
        let service = service();
        let mut date = day("2026-08-01");

        for _ in 0..5 {
            service.start_session("u1", date, None).await.unwrap();
            date = date + Days::new(1);
        }

        let snapshot = service.get_progress("u1").await.unwrap();
        assert_eq!(snapshot.current_streak, 5);
        assert_eq!(snapshot.longest_streak, 5);
        assert_eq!(snapshot.total_login_days, 5);
    }

    #[tokio::test]
    async fn a_gap_breaks_the_streak_but_keeps_the_longest() {
        let service = service();

        for date in ["2026-08-01", "2026-08-02", "2026-08-03"] {
            service.start_session("u1", day(date), None).await.unwrap();
        }
        let session = service
            .start_session("u1", day("2026-08-10"), None)
            .await
            .unwrap();

        assert_eq!(session.snapshot.current_streak, 1);
        assert_eq!(session.snapshot.longest_streak, 3);
        assert_eq!(session.snapshot.total_login_days, 4);
    }

    #[tokio::test]
    async fn session_start_merges_the_local_draft() {
        let service = service();
        let draft = ProfileDraft {
            name: Some("Alex".into()),
            ..ProfileDraft::default()
        };

        let session = service
            .start_session("u1", day("2026-08-25"), Some(draft))
            .await
            .unwrap();

        assert_eq!(session.snapshot.profile.name.as_deref(), Some("Alex"));
        // Name alone is not enough to complete onboarding.
        assert!(!session.snapshot.is_onboarding_complete);
    }

    #[tokio::test]
    async fn ledger_replay_reproduces_the_balance() {
        let service = service();

        service.award_gems("u1", 10, "activity").await.unwrap();
        service.award_gems("u1", 25, "activity").await.unwrap();
        service.spend_gems("u1", 8, "shop").await.unwrap();
        service.award_gems("u1", 5, "activity").await.unwrap();

        let snapshot = service.get_progress("u1").await.unwrap();
        let transactions = service.recent_transactions("u1", Some(100)).await.unwrap();

        let replayed: i64 = transactions.iter().map(|t| t.amount).sum();
        assert_eq!(replayed, snapshot.gems);

        let earned: i64 = transactions.iter().map(|t| t.amount.max(0)).sum();
        assert_eq!(earned, snapshot.total_gems_earned);

        // Each entry records the balance it produced; the newest matches.
        assert_eq!(transactions[0].new_balance, snapshot.gems);
    }

    #[tokio::test]
    async fn award_rejects_non_positive_amounts() {
        let service = service();

        let err = service.award_gems("u1", 0, "activity").await.unwrap_err();
        assert_matches!(err, AppError::Core(_));
    }

    #[tokio::test]
    async fn spend_rejects_overdraft() {
        let service = service();
        service.award_gems("u1", 5, "activity").await.unwrap();

        let err = service.spend_gems("u1", 6, "shop").await.unwrap_err();
        assert_matches!(err, AppError::Core(_));
    }

    #[tokio::test]
    async fn review_reward_uses_the_current_streak_milestone() {
        let service = service();

        // Build a 7-day streak.
        let mut date = day("2026-08-01");
        for _ in 0..7 {
            service.start_session("u1", date, None).await.unwrap();
            date = date + Days::new(1);
        }

        let reward = service.complete_review("u1", 3).await.unwrap();

        assert_eq!(reward.streak, 7);
        assert_eq!(reward.gems_awarded, 18);
        assert_eq!(reward.new_total, 18);
    }

    #[tokio::test]
    async fn review_rejects_an_empty_session() {
        let service = service();
        let err = service.complete_review("u1", 0).await.unwrap_err();
        assert_matches!(err, AppError::Core(_));
    }

    #[tokio::test]
    async fn review_rejects_an_oversized_session() {
        let service = service();
        let err = service
            .complete_review("u1", gems::MAX_CARDS_PER_SESSION + 1)
            .await
            .unwrap_err();
        assert_matches!(err, AppError::Core(_));
    }

    #[tokio::test]
    async fn saving_a_profile_twice_is_idempotent() {
        let service = service();
        let draft = ProfileDraft {
            name: Some("Alex".into()),
            proficiency_level: Some(ProficiencyLevel::B1),
            ..ProfileDraft::default()
        };

        let first = service.save_profile("u1", draft.clone()).await.unwrap();
        let second = service.save_profile("u1", draft).await.unwrap();

        assert!(first.is_complete);
        assert_eq!(first.profile, second.profile);
    }

    #[tokio::test]
    async fn sentinel_name_never_completes_onboarding() {
        let service = service();
        let draft = ProfileDraft {
            name: Some("User".into()),
            proficiency_level: Some(ProficiencyLevel::A1),
            ..ProfileDraft::default()
        };

        let status = service.save_profile("u1", draft).await.unwrap();

        assert!(!status.is_complete);
        assert_eq!(status.profile.name, None);
    }

    #[tokio::test]
    async fn remote_profile_wins_over_the_local_draft() {
        let service = service();
        service
            .save_profile(
                "u1",
                ProfileDraft {
                    name: Some("Sam".into()),
                    ..ProfileDraft::default()
                },
            )
            .await
            .unwrap();

        let local = ProfileDraft {
            name: Some("Alex".into()),
            proficiency_level: Some(ProficiencyLevel::A2),
            ..ProfileDraft::default()
        };
        let status = service.load_profile("u1", Some(local)).await.unwrap();

        assert_eq!(status.profile.name.as_deref(), Some("Sam"));
        assert_eq!(status.profile.proficiency_level, Some(ProficiencyLevel::A2));
    }

    // -----------------------------------------------------------------
    // Failure isolation
    // -----------------------------------------------------------------

    /// Store whose writes fail but whose reads serve a fixed record.
    struct WriteFailingStore {
        record: ProgressRecord,
    }

    #[async_trait]
    impl ProgressStore for WriteFailingStore {
        async fn get_record(&self, _uid: &str) -> Result<Option<ProgressRecord>, StoreError> {
            Ok(Some(self.record.clone()))
        }

        async fn put_record(
            &self,
            _uid: &str,
            _patch: RecordPatch,
        ) -> Result<ProgressRecord, StoreError> {
            Err(StoreError::Unavailable("write refused".into()))
        }

        async fn append_transaction(
            &self,
            _uid: &str,
            _entry: NewGemTransaction,
        ) -> Result<GemTransaction, StoreError> {
            Err(StoreError::Unavailable("write refused".into()))
        }

        async fn recent_transactions(
            &self,
            _uid: &str,
            _limit: i64,
        ) -> Result<Vec<GemTransaction>, StoreError> {
            Ok(Vec::new())
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Store that only fails ledger appends.
    struct LedgerFailingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl ProgressStore for LedgerFailingStore {
        async fn get_record(&self, uid: &str) -> Result<Option<ProgressRecord>, StoreError> {
            self.inner.get_record(uid).await
        }

        async fn put_record(
            &self,
            uid: &str,
            patch: RecordPatch,
        ) -> Result<ProgressRecord, StoreError> {
            self.inner.put_record(uid, patch).await
        }

        async fn append_transaction(
            &self,
            _uid: &str,
            _entry: NewGemTransaction,
        ) -> Result<GemTransaction, StoreError> {
            Err(StoreError::Timeout)
        }

        async fn recent_transactions(
            &self,
            uid: &str,
            limit: i64,
        ) -> Result<Vec<GemTransaction>, StoreError> {
            self.inner.recent_transactions(uid, limit).await
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            self.inner.health_check().await
        }
    }

    #[tokio::test]
    async fn failed_streak_write_returns_the_stale_counters() {
        let mut record = ProgressRecord::new(Utc::now());
        record.current_streak = 4;
        record.longest_streak = 6;
        record.total_login_days = 30;
        record.last_login_date = Some(day("2026-08-24"));

        let service = ProgressService::new(Arc::new(WriteFailingStore { record }));

        let session = service
            .start_session("u1", day("2026-08-25"), None)
            .await
            .unwrap();

        assert!(!session.persisted);
        assert!(!session.streak_counted);
        // The caller's view keeps the previously stored counters.
        assert_eq!(session.snapshot.current_streak, 4);
        assert_eq!(session.snapshot.total_login_days, 30);
    }

    #[tokio::test]
    async fn ledger_failure_does_not_fail_the_award() {
        let service = ProgressService::new(Arc::new(LedgerFailingStore {
            inner: MemoryStore::new(),
        }));

        let award = service.award_gems("u1", 10, "activity").await.unwrap();

        assert_eq!(award.new_total, 10);
        let snapshot = service.get_progress("u1").await.unwrap();
        assert_eq!(snapshot.gems, 10);
        // History is missing the entry; the balance is still authoritative.
        assert!(service
            .recent_transactions("u1", Some(10))
            .await
            .unwrap()
            .is_empty());
    }
}
