// SPDX-License-Identifier: MIT
//! SQLite bootstrap — connection pool, WAL tuning, and schema migration.
//!
//! The engine's tables are created with idempotent `CREATE TABLE IF NOT
//! EXISTS` statements at startup. The Progress Store and Unlock Ledger are
//! thin query layers over the shared pool (see `progress::store` and
//! `progress::ledger`).

use anyhow::{Context as _, Result};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding
    /// it are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("questd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            use sqlx::ConnectOptions as _;
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    /// The Progress Store and Unlock Ledger share this pool.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        // One progress record per user. `coins >= 0` is a hard invariant;
        // `level` is always written together with `xp` using the same
        // formula as `progress::level::level_for_xp`.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_progress (
                user_id         TEXT PRIMARY KEY,
                coins           INTEGER NOT NULL DEFAULT 0 CHECK (coins >= 0),
                xp              INTEGER NOT NULL DEFAULT 0,
                level           INTEGER NOT NULL DEFAULT 1,
                total_actions   INTEGER NOT NULL DEFAULT 0,
                daily_streak    INTEGER NOT NULL DEFAULT 0,
                last_login_date TEXT NOT NULL DEFAULT '1970-01-01',
                last_activity   TEXT NOT NULL,
                title           TEXT,
                created_at      TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .context("create user_progress table")?;

        // The (user_id, code) primary key is the at-most-once unlock
        // guarantee: concurrent evaluators race on INSERT OR IGNORE and
        // exactly one wins.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS achievement_unlocks (
                user_id        TEXT NOT NULL,
                code           TEXT NOT NULL,
                unlocked_at    TEXT NOT NULL,
                reward_applied INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, code)
            )",
        )
        .execute(pool)
        .await
        .context("create achievement_unlocks table")?;

        // Per-(user, metric) activity counters — backing store for the
        // built-in counter Metric Providers, bumped in the same transaction
        // as the action reward.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS activity_counters (
                user_id TEXT NOT NULL,
                metric  TEXT NOT NULL,
                count   INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, metric)
            )",
        )
        .execute(pool)
        .await
        .context("create activity_counters table")?;

        // Idempotency keys for retried applyAction calls. A duplicate key
        // turns the retry into a no-op instead of a double-count.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS action_dedup (
                idempotency_key TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                applied_at      TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .context("create action_dedup table")?;

        Ok(())
    }
}
