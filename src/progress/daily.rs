// SPDX-License-Identifier: MIT
//! Daily Bonus Evaluator — grants the login bonus at most once per UTC
//! calendar day and advances the streak.
//!
//! This is an explicit command, separate from the pure progress read;
//! callers wanting the combined "query grants bonus" behaviour compose the
//! two (see `handlers::check_in`). The day boundary is UTC midnight — a
//! fixed reference timezone rather than server wall-clock, so deployments in
//! different timezones agree on what "today" means.

use chrono::{DateTime, Utc};

use crate::config::RewardsConfig;
use crate::error::EngineResult;

use super::store::ProgressStore;

#[derive(Clone)]
pub struct DailyBonusEvaluator {
    store: ProgressStore,
    bonus_coins: u64,
    bonus_xp: u64,
}

impl DailyBonusEvaluator {
    pub fn new(store: ProgressStore, rewards: &RewardsConfig) -> Self {
        Self {
            store,
            bonus_coins: rewards.daily_bonus_coins,
            bonus_xp: rewards.daily_bonus_xp,
        }
    }

    /// Evaluate the bonus for `user_id` at instant `now`.
    ///
    /// Awards `+coins/+xp`, advances the streak and stamps the login day iff
    /// `day(now) > last_login_date`; otherwise mutates nothing. Idempotent
    /// for repeated calls within the same day — the check and the grant are
    /// one conditional UPDATE in the store, so concurrent check-ins cannot
    /// double-award.
    pub async fn evaluate(&self, user_id: &str, now: DateTime<Utc>) -> EngineResult<bool> {
        self.store
            .grant_daily_bonus(user_id, self.bonus_coins, self.bonus_xp, now)
            .await
    }
}
