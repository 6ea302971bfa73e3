// SPDX-License-Identifier: MIT
//! Metric Providers — the external seam supplying the current value of a
//! named metric for a user.
//!
//! Feature areas outside the engine (notes, goals, prayer log) own their
//! metrics; they either let the built-in counter provider track them via the
//! action pipeline, or register their own provider here. The evaluator only
//! ever sees the trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

use super::model::Metric;
use super::store::ProgressStore;

/// Contract: `value(user_id) -> number`. A provider that errors causes the
/// evaluator to skip only the achievements measured against it.
#[async_trait]
pub trait MetricProvider: Send + Sync {
    async fn value(&self, user_id: &str) -> EngineResult<u64>;
}

/// Registry mapping each [`Metric`] to its provider. Cloning is cheap; the
/// map is frozen behind an `Arc` once the daemon is wired up.
#[derive(Clone)]
pub struct MetricRegistry {
    providers: Arc<HashMap<Metric, Arc<dyn MetricProvider>>>,
}

impl MetricRegistry {
    /// Build the default registry: activity counters for the countable
    /// metrics, progress-record fields for the rest.
    pub fn with_defaults(store: ProgressStore) -> Self {
        let mut providers: HashMap<Metric, Arc<dyn MetricProvider>> = HashMap::new();
        for metric in [
            Metric::NotesWritten,
            Metric::GoalsCompleted,
            Metric::PrayersLogged,
        ] {
            providers.insert(
                metric,
                Arc::new(CounterProvider { store: store.clone(), metric }),
            );
        }
        for metric in [
            Metric::CoinBalance,
            Metric::XpLevel,
            Metric::DailyStreak,
            Metric::TotalActions,
        ] {
            providers.insert(
                metric,
                Arc::new(ProgressFieldProvider { store: store.clone(), metric }),
            );
        }
        Self { providers: Arc::new(providers) }
    }

    /// Build a registry from an explicit provider map (tests, embedders).
    pub fn from_map(map: HashMap<Metric, Arc<dyn MetricProvider>>) -> Self {
        Self { providers: Arc::new(map) }
    }

    /// Current value of `metric` for `user_id`.
    pub async fn value(&self, metric: Metric, user_id: &str) -> EngineResult<u64> {
        let provider = self
            .providers
            .get(&metric)
            .ok_or_else(|| EngineError::MetricUnavailable(metric.as_str().to_string()))?;
        provider.value(user_id).await
    }
}

/// Reads the per-(user, metric) activity counter bumped by the action
/// pipeline.
struct CounterProvider {
    store: ProgressStore,
    metric: Metric,
}

#[async_trait]
impl MetricProvider for CounterProvider {
    async fn value(&self, user_id: &str) -> EngineResult<u64> {
        self.store.counter_value(user_id, self.metric).await
    }
}

/// Reads a field straight off the progress record. A user without a record
/// yet reports zero for everything (level floors at 1 only once the record
/// exists — an absent user has nothing to measure).
struct ProgressFieldProvider {
    store: ProgressStore,
    metric: Metric,
}

#[async_trait]
impl MetricProvider for ProgressFieldProvider {
    async fn value(&self, user_id: &str) -> EngineResult<u64> {
        let Some(record) = self.store.get(user_id).await? else {
            return Ok(0);
        };
        let value = match self.metric {
            Metric::CoinBalance => record.coins,
            Metric::XpLevel => record.level,
            Metric::DailyStreak => record.daily_streak,
            Metric::TotalActions => record.total_actions,
            // Counter-backed metrics never route here.
            _ => 0,
        };
        Ok(value.max(0) as u64)
    }
}
