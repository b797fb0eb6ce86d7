//! PostgreSQL [`ProgressStore`] implementation.
//!
//! The progress document maps to one row in `user_progress`; the gem ledger
//! is the append-only `gem_transactions` table. All queries are runtime
//! checked (`query_as::<_, T>`) so the crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use lingochat_core::level;

use crate::record::{GemTransaction, NewGemTransaction, ProgressRecord, RecordPatch};
use crate::{ProgressStore, StoreError};

pub type DbPool = PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Apply pending migrations from `crates/store/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Column list for `user_progress` queries.
const COLUMNS: &str = "\
    name, proficiency_level, target_language, learning_goals, \
    preferred_topics, daily_goal_minutes, current_streak, longest_streak, \
    total_login_days, last_login_date, gems, total_gems_earned, \
    created_at, updated_at";

/// Column list for `gem_transactions` queries.
const TRANSACTION_COLUMNS: &str = "id, amount, reason, new_balance, created_at";

/// A row from the `user_progress` table. The level is stored as its
/// canonical text code; conversion back to the enum runs it through the
/// normalizer so a legacy label left behind by an old writer still decodes.
#[derive(Debug, FromRow)]
struct ProgressRow {
    name: Option<String>,
    proficiency_level: Option<String>,
    target_language: Option<String>,
    learning_goals: Vec<String>,
    preferred_topics: Vec<String>,
    daily_goal_minutes: Option<i32>,
    current_streak: i64,
    longest_streak: i64,
    total_login_days: i64,
    last_login_date: Option<NaiveDate>,
    gems: i64,
    total_gems_earned: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProgressRow> for ProgressRecord {
    fn from(row: ProgressRow) -> Self {
        let proficiency_level = row.proficiency_level.map(|stored| {
            let (level, warning) = level::normalize(&stored);
            if let Some(w) = warning {
                tracing::warn!(stored = %w.input, "Stored proficiency level is not a CEFR code");
            }
            level
        });

        ProgressRecord {
            name: row.name,
            proficiency_level,
            target_language: row.target_language,
            learning_goals: row.learning_goals,
            preferred_topics: row.preferred_topics,
            daily_goal_minutes: row.daily_goal_minutes,
            current_streak: row.current_streak,
            longest_streak: row.longest_streak,
            total_login_days: row.total_login_days,
            last_login_date: row.last_login_date,
            gems: row.gems,
            total_gems_earned: row.total_gems_earned,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed progress store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn get_record(&self, uid: &str) -> Result<Option<ProgressRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM user_progress WHERE uid = $1");
        let row = sqlx::query_as::<_, ProgressRow>(&query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ProgressRecord::from))
    }

    async fn put_record(
        &self,
        uid: &str,
        patch: RecordPatch,
    ) -> Result<ProgressRecord, StoreError> {
        // Lazy creation: make sure the row exists before merging into it.
        sqlx::query("INSERT INTO user_progress (uid) VALUES ($1) ON CONFLICT (uid) DO NOTHING")
            .bind(uid)
            .execute(&self.pool)
            .await?;

        if patch.is_empty() {
            let query = format!(
                "UPDATE user_progress SET updated_at = now() WHERE uid = $1 RETURNING {COLUMNS}"
            );
            let row = sqlx::query_as::<_, ProgressRow>(&query)
                .bind(uid)
                .fetch_one(&self.pool)
                .await?;
            return Ok(row.into());
        }

        // Build the SET clause dynamically from the fields the patch carries.
        let mut set_clauses: Vec<String> = Vec::new();
        let mut param_idx: usize = 2; // $1 is uid

        let mut push = |set_clauses: &mut Vec<String>, column: &str| {
            set_clauses.push(format!("{column} = ${param_idx}"));
            param_idx += 1;
        };

        if patch.name.is_some() {
            push(&mut set_clauses, "name");
        }
        if patch.proficiency_level.is_some() {
            push(&mut set_clauses, "proficiency_level");
        }
        if patch.target_language.is_some() {
            push(&mut set_clauses, "target_language");
        }
        if patch.learning_goals.is_some() {
            push(&mut set_clauses, "learning_goals");
        }
        if patch.preferred_topics.is_some() {
            push(&mut set_clauses, "preferred_topics");
        }
        if patch.daily_goal_minutes.is_some() {
            push(&mut set_clauses, "daily_goal_minutes");
        }
        if patch.streak.is_some() {
            push(&mut set_clauses, "current_streak");
            push(&mut set_clauses, "longest_streak");
            push(&mut set_clauses, "total_login_days");
            push(&mut set_clauses, "last_login_date");
        }
        if patch.balance.is_some() {
            push(&mut set_clauses, "gems");
            push(&mut set_clauses, "total_gems_earned");
        }
        set_clauses.push("updated_at = now()".to_string());

        let query = format!(
            "UPDATE user_progress SET {} WHERE uid = $1 RETURNING {COLUMNS}",
            set_clauses.join(", ")
        );

        let mut q = sqlx::query_as::<_, ProgressRow>(&query).bind(uid);

        if let Some(ref name) = patch.name {
            q = q.bind(name);
        }
        if let Some(level) = patch.proficiency_level {
            q = q.bind(level.as_str());
        }
        if let Some(ref lang) = patch.target_language {
            q = q.bind(lang);
        }
        if let Some(ref goals) = patch.learning_goals {
            q = q.bind(goals);
        }
        if let Some(ref topics) = patch.preferred_topics {
            q = q.bind(topics);
        }
        if let Some(minutes) = patch.daily_goal_minutes {
            q = q.bind(minutes);
        }
        if let Some(streak) = patch.streak {
            q = q
                .bind(streak.current_streak)
                .bind(streak.longest_streak)
                .bind(streak.total_login_days)
                .bind(streak.last_login_date);
        }
        if let Some(balance) = patch.balance {
            q = q.bind(balance.gems).bind(balance.total_gems_earned);
        }

        let row = q.fetch_one(&self.pool).await?;
        Ok(row.into())
    }

    async fn append_transaction(
        &self,
        uid: &str,
        entry: NewGemTransaction,
    ) -> Result<GemTransaction, StoreError> {
        let query = format!(
            "INSERT INTO gem_transactions (id, uid, amount, reason, new_balance) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let transaction = sqlx::query_as::<_, GemTransaction>(&query)
            .bind(Uuid::new_v4())
            .bind(uid)
            .bind(entry.amount)
            .bind(&entry.reason)
            .bind(entry.new_balance)
            .fetch_one(&self.pool)
            .await?;
        Ok(transaction)
    }

    async fn recent_transactions(
        &self,
        uid: &str,
        limit: i64,
    ) -> Result<Vec<GemTransaction>, StoreError> {
        let query = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM gem_transactions \
             WHERE uid = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        let transactions = sqlx::query_as::<_, GemTransaction>(&query)
            .bind(uid)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?;
        Ok(transactions)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
