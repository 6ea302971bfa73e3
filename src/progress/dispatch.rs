// SPDX-License-Identifier: MIT
//! Reward Dispatcher — applies an achievement's reward payload to the
//! progress record, exactly once per ledger entry.
//!
//! Dispatch runs only after the ledger insert has durably committed. The
//! reward transaction first flips the entry's `reward_applied` flag with a
//! `WHERE reward_applied = 0` guard and only then credits the coins, so a
//! crash anywhere leaves either nothing or everything: rows still at 0 are
//! re-dispatched by `redispatch_pending` at startup, and a retried dispatch
//! for an already-applied row is a no-op.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::EngineResult;

use super::model::{AchievementDefinition, Reward};
use super::registry;

#[derive(Clone)]
pub struct RewardDispatcher {
    pool: SqlitePool,
}

impl RewardDispatcher {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply `def`'s reward to `user_id`, gated on the unlock row's
    /// `reward_applied` flag. Returns `true` if this call performed the
    /// dispatch, `false` if the reward was already applied.
    pub async fn dispatch(
        &self,
        user_id: &str,
        def: &AchievementDefinition,
    ) -> EngineResult<bool> {
        self.dispatch_reward(user_id, def.code, &def.reward).await
    }

    async fn dispatch_reward(
        &self,
        user_id: &str,
        code: &str,
        reward: &Reward,
    ) -> EngineResult<bool> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // Claim the ledger entry first. Zero rows affected means another
        // dispatcher (or a previous run) already applied this reward.
        let claimed = sqlx::query(
            "UPDATE achievement_unlocks SET reward_applied = 1
             WHERE user_id = ? AND code = ? AND reward_applied = 0",
        )
        .bind(user_id)
        .bind(code)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            return Ok(false);
        }

        // Achievement rewards credit coins and XP but are not user actions —
        // total_actions stays untouched.
        let coins = reward.coins.unwrap_or(0) as i64;
        if coins > 0 {
            sqlx::query(
                "UPDATE user_progress SET
                    coins = coins + ?,
                    xp = xp + ?,
                    level = ((xp + ?) / 100) + 1,
                    last_activity = ?
                 WHERE user_id = ?",
            )
            .bind(coins)
            .bind(coins)
            .bind(coins)
            .bind(&now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(title) = reward.title {
            sqlx::query("UPDATE user_progress SET title = ? WHERE user_id = ?")
                .bind(title)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Startup recovery: re-dispatch rewards for ledger entries that were
    /// inserted but never credited. Returns the number of rows recovered.
    pub async fn redispatch_pending(&self) -> EngineResult<u64> {
        let pending = {
            let rows: Vec<(String, String)> = sqlx::query_as(
                "SELECT user_id, code FROM achievement_unlocks WHERE reward_applied = 0",
            )
            .fetch_all(&self.pool)
            .await?;
            rows
        };

        let mut recovered = 0u64;
        for (user_id, code) in pending {
            let Some(def) = registry::by_code(&code) else {
                // A code no longer in the catalog — leave the row alone.
                warn!(code = %code, "pending reward for unknown achievement code");
                continue;
            };
            if self.dispatch_reward(&user_id, &code, &def.reward).await? {
                info!(user = %user_id, code = %code, "re-dispatched achievement reward");
                recovered += 1;
            }
        }
        Ok(recovered)
    }
}
