// SPDX-License-Identifier: MIT
//! Achievement Evaluator — compares live metric values against registry
//! targets, consults the Unlock Ledger, and unlocks whatever newly crossed
//! its threshold.
//!
//! Per (user, achievement) the state machine is NotStarted → InProgress →
//! Unlocked, with Unlocked terminal: once a ledger row exists the definition
//! is never re-evaluated, even if the metric later regresses below target.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::EngineResult;

use super::dispatch::RewardDispatcher;
use super::ledger::UnlockLedger;
use super::metrics::MetricRegistry;
use super::model::{AchievementDefinition, AchievementStatus, Metric};
use super::registry;

#[derive(Clone)]
pub struct AchievementEvaluator {
    ledger: UnlockLedger,
    metrics: MetricRegistry,
    dispatcher: RewardDispatcher,
}

impl AchievementEvaluator {
    pub fn new(
        ledger: UnlockLedger,
        metrics: MetricRegistry,
        dispatcher: RewardDispatcher,
    ) -> Self {
        Self { ledger, metrics, dispatcher }
    }

    /// Evaluate all definitions for `user_id` and return the ones newly
    /// unlocked during this call.
    ///
    /// Metrics are read after the triggering progress mutation has
    /// committed, so every comparison sees a consistent post-commit
    /// snapshot; the ledger insert is the only unlock arbiter. A provider
    /// failure skips just that definition — it is retried on the next call,
    /// with no partial state persisted.
    pub async fn evaluate(
        &self,
        user_id: &str,
    ) -> EngineResult<Vec<&'static AchievementDefinition>> {
        let unlocked = self.ledger.codes_for_user(user_id).await?;
        let mut newly = Vec::new();

        for def in registry::all() {
            if unlocked.contains(def.code) {
                continue;
            }
            self.try_unlock(user_id, def, &mut newly).await?;
        }

        // Dispatched rewards credit coins and XP, which can push the
        // balance- and level-measured definitions over their own targets
        // within this same call. One follow-up pass catches those.
        if !newly.is_empty() {
            let crossed: Vec<&'static AchievementDefinition> = registry::all()
                .iter()
                .filter(|d| {
                    matches!(d.metric, Metric::CoinBalance | Metric::XpLevel)
                        && !unlocked.contains(d.code)
                        && !newly.iter().any(|n| n.code == d.code)
                })
                .collect();
            for def in crossed {
                self.try_unlock(user_id, def, &mut newly).await?;
            }
        }

        Ok(newly)
    }

    async fn try_unlock(
        &self,
        user_id: &str,
        def: &'static AchievementDefinition,
        newly: &mut Vec<&'static AchievementDefinition>,
    ) -> EngineResult<()> {
        let current = match self.metrics.value(def.metric, user_id).await {
            Ok(v) => v,
            Err(e) => {
                warn!(code = %def.code, err = %e, "metric unavailable — skipping");
                return Ok(());
            }
        };
        if current < def.target {
            return Ok(());
        }

        // First insert wins; a concurrent evaluator that loses observes the
        // existing row, dispatches nothing, and reports nothing.
        if self.ledger.insert_if_absent(user_id, def.code, Utc::now()).await? {
            self.dispatcher.dispatch(user_id, def).await?;
            info!(user = %user_id, code = %def.code, "achievement unlocked");
            newly.push(def);
        }
        Ok(())
    }

    /// Full catalog joined with the user's unlock state, for
    /// `achievements.list`. The progress fraction is `min(1, current/target)`
    /// for UI bars — informational only, never consulted for unlock
    /// decisions. A failing provider reports zero progress rather than
    /// failing the listing.
    pub async fn statuses(&self, user_id: &str) -> EngineResult<Vec<AchievementStatus>> {
        let unlocks = self.ledger.list_for_user(user_id).await?;
        let mut statuses = Vec::with_capacity(registry::all().len());

        for def in registry::all() {
            let unlocked_at = unlocks
                .iter()
                .find(|u| u.code == def.code)
                .map(|u| u.unlocked_at.clone());

            let progress = if unlocked_at.is_some() {
                1.0
            } else {
                match self.metrics.value(def.metric, user_id).await {
                    Ok(current) => (current as f64 / def.target as f64).min(1.0),
                    Err(e) => {
                        warn!(code = %def.code, err = %e, "metric unavailable for listing");
                        0.0
                    }
                }
            };

            statuses.push(AchievementStatus {
                code: def.code,
                title: def.title,
                description: def.description,
                icon: def.icon,
                rarity: def.rarity,
                metric: def.metric,
                target: def.target,
                unlocked: unlocked_at.is_some(),
                unlocked_at,
                progress,
            });
        }

        Ok(statuses)
    }
}
