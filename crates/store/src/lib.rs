//! Persistence port for user progress records.
//!
//! [`ProgressStore`] models the minimal document-store contract the progress
//! module needs: fetch-by-key, create-or-merge write, an append-only
//! sub-collection (the gem ledger), and an ordered, limited read of that
//! sub-collection. Two implementations are provided: [`memory::MemoryStore`]
//! for tests and local development, and [`postgres::PgStore`] for production.

pub mod memory;
pub mod postgres;
pub mod record;

use async_trait::async_trait;

pub use record::{GemTransaction, NewGemTransaction, ProgressRecord, RecordPatch};

/// Errors from persistence-port calls. Callers treat every variant as the
/// recoverable "network error" kind: fall back to previously known state for
/// reads, report mutations as failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store call timed out")]
    Timeout,

    #[error("Store permission denied: {0}")]
    Denied(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The persistence port: one progress document per user, keyed by the
/// external auth provider's user id, plus an append-only gem ledger.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Fetch a user's record. `Ok(None)` means the record does not exist yet.
    async fn get_record(&self, uid: &str) -> Result<Option<ProgressRecord>, StoreError>;

    /// Create-or-merge write: absent patch fields leave the stored value
    /// untouched, present fields overwrite. Lazily creates the record (with
    /// zeroed counters) when it does not exist. `updated_at` is stamped on
    /// every call.
    async fn put_record(&self, uid: &str, patch: RecordPatch)
        -> Result<ProgressRecord, StoreError>;

    /// Append one entry to the user's gem ledger.
    async fn append_transaction(
        &self,
        uid: &str,
        entry: NewGemTransaction,
    ) -> Result<GemTransaction, StoreError>;

    /// The most recent ledger entries, newest first.
    async fn recent_transactions(
        &self,
        uid: &str,
        limit: i64,
    ) -> Result<Vec<GemTransaction>, StoreError>;

    /// Cheap connectivity probe for health checks.
    async fn health_check(&self) -> Result<(), StoreError>;
}
