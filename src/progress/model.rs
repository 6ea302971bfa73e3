// SPDX-License-Identifier: MIT
//! Progress & achievement data models — serialisable types used by the
//! engine and returned by the progress RPCs.

use serde::{Deserialize, Serialize};

use super::level::level_for_xp;

// ─── Progress record ──────────────────────────────────────────────────────────

/// One row per user, owned exclusively by the Progress Store.
///
/// Invariants:
/// - `level == xp / 100 + 1`, recomputed inside every XP-changing statement;
/// - `coins >= 0` (enforced by a CHECK constraint);
/// - `total_actions` is monotonically non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressRecord {
    pub user_id: String,
    pub coins: i64,
    pub xp: i64,
    pub level: i64,
    pub total_actions: i64,
    pub daily_streak: i64,
    /// UTC calendar date of the last login bonus, `"YYYY-MM-DD"`.
    /// `"1970-01-01"` for a freshly created record.
    pub last_login_date: String,
    /// RFC 3339 timestamp of the last engine-applied mutation.
    pub last_activity: String,
    /// Cosmetic title granted by an achievement reward. Opaque to the engine.
    pub title: Option<String>,
    pub created_at: String,
}

// ─── Action types ─────────────────────────────────────────────────────────────

/// Every rewardable user action, as an exhaustive tagged enum.
///
/// The wire value is the snake_case action name (e.g. `"create_note"`).
/// Unrecognised strings deserialize to [`ActionType::Other`], which carries a
/// zero default reward — unknown actions are never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CreateNote,
    CompleteGoal,
    LogPrayer,
    CreateEvent,
    #[serde(other)]
    Other,
}

impl ActionType {
    /// Built-in coin/XP reward for this action, used when the caller passes
    /// no explicit amount and config carries no override.
    pub fn default_coins(self) -> u64 {
        match self {
            ActionType::CreateNote => 10,
            ActionType::CompleteGoal => 25,
            ActionType::LogPrayer => 15,
            ActionType::CreateEvent => 10,
            ActionType::Other => 0,
        }
    }

    /// Stable wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::CreateNote => "create_note",
            ActionType::CompleteGoal => "complete_goal",
            ActionType::LogPrayer => "log_prayer",
            ActionType::CreateEvent => "create_event",
            ActionType::Other => "other",
        }
    }

    /// The activity counter this action feeds, if any.
    pub fn counter_metric(self) -> Option<Metric> {
        match self {
            ActionType::CreateNote => Some(Metric::NotesWritten),
            ActionType::CompleteGoal => Some(Metric::GoalsCompleted),
            ActionType::LogPrayer => Some(Metric::PrayersLogged),
            ActionType::CreateEvent | ActionType::Other => None,
        }
    }
}

// ─── Metrics ──────────────────────────────────────────────────────────────────

/// Names the Metric Provider an achievement target is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NotesWritten,
    GoalsCompleted,
    PrayersLogged,
    CoinBalance,
    XpLevel,
    DailyStreak,
    TotalActions,
}

impl Metric {
    /// Stable key used in the `activity_counters` table and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::NotesWritten => "notes_written",
            Metric::GoalsCompleted => "goals_completed",
            Metric::PrayersLogged => "prayers_logged",
            Metric::CoinBalance => "coin_balance",
            Metric::XpLevel => "xp_level",
            Metric::DailyStreak => "daily_streak",
            Metric::TotalActions => "total_actions",
        }
    }
}

// ─── Achievements ─────────────────────────────────────────────────────────────

/// Rarity tier, ordered: common < rare < epic < legendary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Reward payload of an achievement: coins (applied additively to both coins
/// and XP, like an action reward) and/or a cosmetic title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coins: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'static str>,
}

impl Reward {
    pub const fn coins(coins: u64) -> Self {
        Self { coins: Some(coins), title: None }
    }

    pub const fn coins_and_title(coins: u64, title: &'static str) -> Self {
        Self { coins: Some(coins), title: Some(title) }
    }
}

/// Immutable achievement definition, part of the static registry.
/// No unlock state lives here — only definitions.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementDefinition {
    /// Stable unique key, e.g. `"first_note"`. Never reused or renamed.
    pub code: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rarity: Rarity,
    pub metric: Metric,
    pub target: u64,
    pub reward: Reward,
}

/// One row per (user, unlocked achievement), owned by the Unlock Ledger.
/// The `(user_id, code)` primary key is the at-most-once guarantee.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AchievementUnlock {
    pub user_id: String,
    pub code: String,
    pub unlocked_at: String,
    /// Set once the reward for this unlock has been dispatched. Rows left at
    /// false by a crash are re-dispatched on startup.
    pub reward_applied: bool,
}

/// Catalog entry joined with a user's unlock state, for `achievements.list`.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementStatus {
    pub code: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rarity: Rarity,
    pub metric: Metric,
    pub target: u64,
    pub unlocked: bool,
    pub unlocked_at: Option<String>,
    /// `min(1.0, current / target)` for UI progress bars. Always `1.0` once
    /// unlocked, regardless of where the live metric sits.
    pub progress: f64,
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

impl ProgressRecord {
    /// Check the level/XP formula holds. Used by tests and startup sanity
    /// logging; the SQL mirrors the same formula in every update.
    pub fn level_consistent(&self) -> bool {
        self.level == level_for_xp(self.xp)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_action_type_maps_to_other() {
        let a: ActionType = serde_json::from_str("\"feed_dragon\"").unwrap();
        assert_eq!(a, ActionType::Other);
        assert_eq!(a.default_coins(), 0);
    }

    #[test]
    fn known_action_types_roundtrip() {
        for (s, a) in [
            ("create_note", ActionType::CreateNote),
            ("complete_goal", ActionType::CompleteGoal),
            ("log_prayer", ActionType::LogPrayer),
            ("create_event", ActionType::CreateEvent),
        ] {
            let parsed: ActionType = serde_json::from_str(&format!("\"{s}\"")).unwrap();
            assert_eq!(parsed, a);
            assert_eq!(a.as_str(), s);
        }
    }

    #[test]
    fn rarity_ordering() {
        assert!(Rarity::Common < Rarity::Rare);
        assert!(Rarity::Rare < Rarity::Epic);
        assert!(Rarity::Epic < Rarity::Legendary);
    }

    #[test]
    fn counter_metrics_only_for_countable_actions() {
        assert_eq!(
            ActionType::CreateNote.counter_metric(),
            Some(Metric::NotesWritten)
        );
        assert_eq!(ActionType::Other.counter_metric(), None);
    }

    #[test]
    fn level_consistency_check() {
        let rec = ProgressRecord {
            user_id: "u1".to_string(),
            coins: 30,
            xp: 230,
            level: 3,
            total_actions: 5,
            daily_streak: 1,
            last_login_date: "2026-02-25".to_string(),
            last_activity: "2026-02-25T10:00:00Z".to_string(),
            title: None,
            created_at: "2026-02-01T00:00:00Z".to_string(),
        };
        assert!(rec.level_consistent());
    }
}
