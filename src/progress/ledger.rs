// SPDX-License-Identifier: MIT
//! Unlock Ledger — the durable set of (user, achievement-code) pairs already
//! awarded.
//!
//! The `(user_id, code)` primary key is the sole concurrency-correctness
//! mechanism for achievements: N concurrent evaluators racing on
//! `INSERT OR IGNORE` collapse into exactly one winner; the losers observe a
//! conflict and no-op. `Unlocked` is terminal — rows are never deleted except
//! by an administrative reset, and never recomputed from live metrics.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::error::EngineResult;

use super::model::AchievementUnlock;

#[derive(Clone)]
pub struct UnlockLedger {
    pool: SqlitePool,
}

impl UnlockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Attempt to record an unlock. Returns `true` if this call was first
    /// (the row was inserted) and `false` if the pair already existed —
    /// either a previous unlock or a concurrent caller that won the race.
    /// The losing side is a silent no-op, never an error.
    pub async fn insert_if_absent(
        &self,
        user_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let affected = sqlx::query(
            "INSERT OR IGNORE INTO achievement_unlocks (user_id, code, unlocked_at)
             VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(code)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    /// All unlocks for a user, oldest first.
    pub async fn list_for_user(&self, user_id: &str) -> EngineResult<Vec<AchievementUnlock>> {
        Ok(sqlx::query_as(
            "SELECT * FROM achievement_unlocks WHERE user_id = ? ORDER BY unlocked_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// The set of unlocked codes for a user — the evaluator's skip list.
    pub async fn codes_for_user(&self, user_id: &str) -> EngineResult<HashSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT code FROM achievement_unlocks WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    /// Ledger rows whose reward was never dispatched (crash between the
    /// insert and the reward transaction). Scanned once at startup.
    pub async fn pending_dispatch(&self) -> EngineResult<Vec<AchievementUnlock>> {
        Ok(
            sqlx::query_as("SELECT * FROM achievement_unlocks WHERE reward_applied = 0")
                .fetch_all(&self.pool)
                .await?,
        )
    }
}
