// SPDX-License-Identifier: MIT
//! Progress Store — the durable per-user record of coins, XP, level, streak
//! and activity counters.
//!
//! Every mutation is an additive, single-statement `UPDATE` (increment by
//! delta), so concurrent mutations commute and no update is ever lost. Level
//! is recomputed inside the same statement with the integer expression
//! `((xp + delta) / 100) + 1`, mirroring `level::level_for_xp` — it is never
//! written independently of XP.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{EngineError, EngineResult};

use super::model::{Metric, ProgressRecord};

#[derive(Clone)]
pub struct ProgressStore {
    pool: SqlitePool,
}

impl ProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the record for `user_id`, creating a zeroed one if absent.
    ///
    /// Create-if-absent is a single `INSERT OR IGNORE` keyed on the primary
    /// key, so concurrent first accesses for the same user resolve to one
    /// surviving row — never read-then-blind-insert.
    pub async fn get_or_create(&self, user_id: &str) -> EngineResult<ProgressRecord> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT OR IGNORE INTO user_progress (user_id, last_activity, created_at)
             VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(user_id.to_string()))
    }

    /// Pure read — no side effects, `None` if the record was never created.
    pub async fn get(&self, user_id: &str) -> EngineResult<Option<ProgressRecord>> {
        Ok(
            sqlx::query_as("SELECT * FROM user_progress WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Apply a plain action reward: `coins += amount`, `xp += amount`,
    /// `total_actions += 1`, level recomputed, `last_activity = now`, and the
    /// action's activity counter bumped — all in one transaction.
    ///
    /// When `idempotency_key` is given and was seen before, nothing is
    /// applied and the current record is returned with `applied = false`.
    pub async fn apply_action_reward(
        &self,
        user_id: &str,
        amount: u64,
        counter: Option<Metric>,
        idempotency_key: Option<&str>,
    ) -> EngineResult<(ProgressRecord, bool)> {
        let now = Utc::now().to_rfc3339();
        let delta = amount as i64;

        let mut tx = self.pool.begin().await?;

        // Lazy creation inside the transaction keeps a first-ever action
        // race-safe without a prior get_or_create call.
        sqlx::query(
            "INSERT OR IGNORE INTO user_progress (user_id, last_activity, created_at)
             VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        if let Some(key) = idempotency_key {
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO action_dedup (idempotency_key, user_id, applied_at)
                 VALUES (?, ?, ?)",
            )
            .bind(key)
            .bind(user_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                // Retry of an already-applied action — absorb it.
                tx.commit().await?;
                let record = self
                    .get(user_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(user_id.to_string()))?;
                return Ok((record, false));
            }
        }

        sqlx::query(
            "UPDATE user_progress SET
                coins = coins + ?,
                xp = xp + ?,
                level = ((xp + ?) / 100) + 1,
                total_actions = total_actions + 1,
                last_activity = ?
             WHERE user_id = ?",
        )
        .bind(delta)
        .bind(delta)
        .bind(delta)
        .bind(&now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if let Some(metric) = counter {
            sqlx::query(
                "INSERT INTO activity_counters (user_id, metric, count) VALUES (?, ?, 1)
                 ON CONFLICT(user_id, metric) DO UPDATE SET count = count + 1",
            )
            .bind(user_id)
            .bind(metric.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let record = self
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(user_id.to_string()))?;
        Ok((record, true))
    }

    /// Grant the daily login bonus at most once per UTC calendar day.
    ///
    /// The stored `last_login_date` is a `"YYYY-MM-DD"` string, so the
    /// once-per-day check and the grant collapse into a single conditional
    /// `UPDATE` — concurrent check-ins on the same day race on the row and
    /// exactly one passes the `last_login_date < ?` guard.
    ///
    /// Returns `true` when the bonus was awarded.
    pub async fn grant_daily_bonus(
        &self,
        user_id: &str,
        coins: u64,
        xp: u64,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let today = now.format("%Y-%m-%d").to_string();
        let now_ts = now.to_rfc3339();
        let affected = sqlx::query(
            "UPDATE user_progress SET
                coins = coins + ?,
                xp = xp + ?,
                level = ((xp + ?) / 100) + 1,
                daily_streak = daily_streak + 1,
                last_login_date = ?,
                last_activity = ?
             WHERE user_id = ? AND last_login_date < ?",
        )
        .bind(coins as i64)
        .bind(xp as i64)
        .bind(xp as i64)
        .bind(&today)
        .bind(&now_ts)
        .bind(user_id)
        .bind(&today)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    /// Current value of a counter-backed metric (0 when never bumped).
    pub async fn counter_value(&self, user_id: &str, metric: Metric) -> EngineResult<u64> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT count FROM activity_counters WHERE user_id = ? AND metric = ?",
        )
        .bind(user_id)
        .bind(metric.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(c,)| c.max(0) as u64).unwrap_or(0))
    }

    /// Administrative reset: delete the progress record, the user's unlock
    /// ledger entries, activity counters and dedup keys in one transaction,
    /// so achievement state stays consistent with the fresh record.
    pub async fn reset(&self, user_id: &str) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM user_progress WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(EngineError::NotFound(user_id.to_string()));
        }

        sqlx::query("DELETE FROM achievement_unlocks WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM activity_counters WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM action_dedup WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
