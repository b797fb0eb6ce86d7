//! In-memory [`ProgressStore`] used by tests and the `STORE=memory` dev mode.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::record::{GemTransaction, NewGemTransaction, ProgressRecord, RecordPatch};
use crate::{ProgressStore, StoreError};

struct UserDoc {
    record: ProgressRecord,
    ledger: Vec<GemTransaction>,
}

impl UserDoc {
    fn new(now: chrono::DateTime<Utc>) -> Self {
        UserDoc {
            record: ProgressRecord::new(now),
            ledger: Vec::new(),
        }
    }
}

/// A `HashMap` behind an async `RwLock`. Same last-writer-wins semantics as
/// the hosted document store it stands in for.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_record(&self, uid: &str) -> Result<Option<ProgressRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(uid).map(|doc| doc.record.clone()))
    }

    async fn put_record(
        &self,
        uid: &str,
        patch: RecordPatch,
    ) -> Result<ProgressRecord, StoreError> {
        let mut users = self.users.write().await;
        let now = Utc::now();
        let doc = users
            .entry(uid.to_string())
            .or_insert_with(|| UserDoc::new(now));
        patch.apply(&mut doc.record, now);
        Ok(doc.record.clone())
    }

    async fn append_transaction(
        &self,
        uid: &str,
        entry: NewGemTransaction,
    ) -> Result<GemTransaction, StoreError> {
        let mut users = self.users.write().await;
        let now = Utc::now();
        let doc = users
            .entry(uid.to_string())
            .or_insert_with(|| UserDoc::new(now));
        let transaction = GemTransaction {
            id: Uuid::new_v4(),
            amount: entry.amount,
            reason: entry.reason,
            new_balance: entry.new_balance,
            created_at: now,
        };
        doc.ledger.push(transaction.clone());
        Ok(transaction)
    }

    async fn recent_transactions(
        &self,
        uid: &str,
        limit: i64,
    ) -> Result<Vec<GemTransaction>, StoreError> {
        let users = self.users.read().await;
        let Some(doc) = users.get(uid) else {
            return Ok(Vec::new());
        };
        Ok(doc
            .ledger
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingochat_core::gems::GemBalance;
    use lingochat_core::level::ProficiencyLevel;
    use lingochat_core::streak::StreakCounters;

    #[tokio::test]
    async fn get_record_returns_none_for_unknown_user() {
        let store = MemoryStore::new();
        assert_eq!(store.get_record("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_record_lazily_creates_with_zeroed_counters() {
        let store = MemoryStore::new();

        let record = store
            .put_record(
                "u1",
                RecordPatch {
                    name: Some("Alex".into()),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.name.as_deref(), Some("Alex"));
        assert_eq!(record.current_streak, 0);
        assert_eq!(record.gems, 0);
    }

    #[tokio::test]
    async fn put_record_merges_without_clobbering_absent_fields() {
        let store = MemoryStore::new();

        store
            .put_record(
                "u1",
                RecordPatch {
                    name: Some("Alex".into()),
                    proficiency_level: Some(ProficiencyLevel::B1),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();

        let record = store
            .put_record(
                "u1",
                RecordPatch {
                    balance: Some(GemBalance {
                        gems: 10,
                        total_gems_earned: 10,
                    }),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.name.as_deref(), Some("Alex"));
        assert_eq!(record.proficiency_level, Some(ProficiencyLevel::B1));
        assert_eq!(record.gems, 10);
    }

    #[tokio::test]
    async fn streak_counters_move_as_a_unit() {
        let store = MemoryStore::new();
        let counters = StreakCounters {
            current_streak: 3,
            longest_streak: 5,
            total_login_days: 12,
            last_login_date: Some("2026-08-25".parse().unwrap()),
        };

        let record = store
            .put_record(
                "u1",
                RecordPatch {
                    streak: Some(counters),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.streak(), counters);
    }

    #[tokio::test]
    async fn recent_transactions_are_newest_first_and_limited() {
        let store = MemoryStore::new();
        for i in 1..=5 {
            store
                .append_transaction(
                    "u1",
                    NewGemTransaction {
                        amount: i,
                        reason: "activity".into(),
                        new_balance: i,
                    },
                )
                .await
                .unwrap();
        }

        let recent = store.recent_transactions("u1", 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].amount, 5);
        assert_eq!(recent[2].amount, 3);
    }
}
