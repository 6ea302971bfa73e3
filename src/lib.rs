// SPDX-License-Identifier: MIT
pub mod config;
pub mod error;
pub mod ipc;
pub mod progress;
pub mod storage;

// Re-export auth so main.rs can use questd::auth directly.
pub use ipc::auth;

use std::sync::Arc;

use config::DaemonConfig;
use ipc::event::EventBroadcaster;
use progress::daily::DailyBonusEvaluator;
use progress::dispatch::RewardDispatcher;
use progress::evaluator::AchievementEvaluator;
use progress::ledger::UnlockLedger;
use progress::metrics::MetricRegistry;
use progress::store::ProgressStore;
use storage::Storage;

/// Shared application state passed to every RPC handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub storage: Arc<Storage>,
    pub broadcaster: Arc<EventBroadcaster>,
    /// Progress Store — the only writer of per-user progress records.
    pub store: ProgressStore,
    /// Unlock Ledger — durable at-most-once achievement unlocks.
    pub ledger: UnlockLedger,
    /// Daily Bonus Evaluator — once-per-UTC-day login bonus.
    pub daily: DailyBonusEvaluator,
    /// Reward Dispatcher — idempotent per-ledger-entry reward application.
    pub dispatcher: RewardDispatcher,
    /// Achievement Evaluator — registry × metrics × ledger.
    pub evaluator: AchievementEvaluator,
    pub started_at: std::time::Instant,
    /// Local WebSocket auth token. Every new connection must send a
    /// `daemon.auth` RPC with this token before any other method call.
    /// Empty string means auth is disabled (not recommended).
    pub auth_token: String,
}

impl AppContext {
    /// Wire the engine components over the shared pool with the default
    /// metric providers. Embedders that supply their own providers build a
    /// [`MetricRegistry`] and call [`AppContext::with_metrics`] instead.
    pub fn assemble(
        config: Arc<DaemonConfig>,
        storage: Arc<Storage>,
        broadcaster: Arc<EventBroadcaster>,
        auth_token: String,
    ) -> Self {
        let store = ProgressStore::new(storage.pool());
        let metrics = MetricRegistry::with_defaults(store.clone());
        Self::with_metrics(config, storage, broadcaster, auth_token, metrics)
    }

    /// Same wiring, with caller-provided metric providers.
    pub fn with_metrics(
        config: Arc<DaemonConfig>,
        storage: Arc<Storage>,
        broadcaster: Arc<EventBroadcaster>,
        auth_token: String,
        metrics: MetricRegistry,
    ) -> Self {
        let store = ProgressStore::new(storage.pool());
        let ledger = UnlockLedger::new(storage.pool());
        let dispatcher = RewardDispatcher::new(storage.pool());
        let daily = DailyBonusEvaluator::new(store.clone(), &config.rewards);
        let evaluator =
            AchievementEvaluator::new(ledger.clone(), metrics, dispatcher.clone());

        Self {
            config,
            storage,
            broadcaster,
            store,
            ledger,
            daily,
            dispatcher,
            evaluator,
            started_at: std::time::Instant::now(),
            auth_token,
        }
    }
}
