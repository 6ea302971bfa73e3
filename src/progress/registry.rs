// SPDX-License-Identifier: MIT
//! Achievement Registry — the static, immutable catalog of achievement
//! definitions. Loaded once, never mutated at runtime.
//!
//! Codes are stable across daemon versions; renaming one would orphan the
//! corresponding ledger rows.

use once_cell::sync::Lazy;

use super::model::{AchievementDefinition, Metric, Rarity, Reward};

static CATALOG: Lazy<Vec<AchievementDefinition>> = Lazy::new(|| {
    vec![
        AchievementDefinition {
            code: "first_note",
            title: "First Note",
            description: "Wrote your first note.",
            icon: "📝",
            rarity: Rarity::Common,
            metric: Metric::NotesWritten,
            target: 1,
            reward: Reward::coins(10),
        },
        AchievementDefinition {
            code: "scribe",
            title: "Scribe",
            description: "Wrote 50 notes.",
            icon: "✒️",
            rarity: Rarity::Rare,
            metric: Metric::NotesWritten,
            target: 50,
            reward: Reward::coins(50),
        },
        AchievementDefinition {
            code: "first_goal",
            title: "First Goal",
            description: "Completed your first goal.",
            icon: "🎯",
            rarity: Rarity::Common,
            metric: Metric::GoalsCompleted,
            target: 1,
            reward: Reward::coins(15),
        },
        AchievementDefinition {
            code: "goal_getter",
            title: "Goal Getter",
            description: "Completed 10 goals.",
            icon: "🏹",
            rarity: Rarity::Rare,
            metric: Metric::GoalsCompleted,
            target: 10,
            reward: Reward::coins(60),
        },
        AchievementDefinition {
            code: "goal_master",
            title: "Goal Master",
            description: "Completed 50 goals.",
            icon: "🏆",
            rarity: Rarity::Epic,
            metric: Metric::GoalsCompleted,
            target: 50,
            reward: Reward::coins_and_title(150, "Goal Master"),
        },
        AchievementDefinition {
            code: "first_prayer",
            title: "First Prayer",
            description: "Logged your first prayer.",
            icon: "🕌",
            rarity: Rarity::Common,
            metric: Metric::PrayersLogged,
            target: 1,
            reward: Reward::coins(10),
        },
        AchievementDefinition {
            code: "devoted",
            title: "Devoted",
            description: "Logged 100 prayers.",
            icon: "🌙",
            rarity: Rarity::Epic,
            metric: Metric::PrayersLogged,
            target: 100,
            reward: Reward::coins_and_title(120, "Devoted"),
        },
        AchievementDefinition {
            code: "100_coins",
            title: "Pocket Money",
            description: "Accumulated 100 coins.",
            icon: "🪙",
            rarity: Rarity::Common,
            metric: Metric::CoinBalance,
            target: 100,
            reward: Reward::coins(25),
        },
        AchievementDefinition {
            code: "1000_coins",
            title: "Treasurer",
            description: "Accumulated 1,000 coins.",
            icon: "💰",
            rarity: Rarity::Epic,
            metric: Metric::CoinBalance,
            target: 1_000,
            reward: Reward::coins(100),
        },
        AchievementDefinition {
            code: "level_5",
            title: "Level 5",
            description: "Reached level 5.",
            icon: "⭐",
            rarity: Rarity::Rare,
            metric: Metric::XpLevel,
            target: 5,
            reward: Reward::coins(50),
        },
        AchievementDefinition {
            code: "level_10",
            title: "Level 10",
            description: "Reached level 10.",
            icon: "🌟",
            rarity: Rarity::Epic,
            metric: Metric::XpLevel,
            target: 10,
            reward: Reward::coins_and_title(100, "Veteran"),
        },
        AchievementDefinition {
            code: "streak_7",
            title: "One Week Streak",
            description: "Checked in 7 days in a row.",
            icon: "🔥",
            rarity: Rarity::Rare,
            metric: Metric::DailyStreak,
            target: 7,
            reward: Reward::coins(70),
        },
        AchievementDefinition {
            code: "streak_30",
            title: "Unstoppable",
            description: "Checked in 30 days in a row.",
            icon: "⚡",
            rarity: Rarity::Legendary,
            metric: Metric::DailyStreak,
            target: 30,
            reward: Reward::coins_and_title(300, "Unstoppable"),
        },
        AchievementDefinition {
            code: "centurion",
            title: "Centurion",
            description: "Performed 100 rewarded actions.",
            icon: "🛡️",
            rarity: Rarity::Rare,
            metric: Metric::TotalActions,
            target: 100,
            reward: Reward::coins(50),
        },
    ]
});

/// All definitions, in catalog order.
pub fn all() -> &'static [AchievementDefinition] {
    &CATALOG
}

/// Look up a definition by its stable code.
pub fn by_code(code: &str) -> Option<&'static AchievementDefinition> {
    CATALOG.iter().find(|d| d.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_unique() {
        let mut seen = HashSet::new();
        for def in all() {
            assert!(seen.insert(def.code), "duplicate code {}", def.code);
        }
    }

    #[test]
    fn targets_are_positive() {
        for def in all() {
            assert!(def.target > 0, "{} has zero target", def.code);
        }
    }

    #[test]
    fn rewards_carry_something() {
        for def in all() {
            assert!(
                def.reward.coins.is_some() || def.reward.title.is_some(),
                "{} has an empty reward",
                def.code
            );
        }
    }

    #[test]
    fn by_code_finds_known_entries() {
        assert_eq!(by_code("first_note").unwrap().target, 1);
        assert_eq!(by_code("100_coins").unwrap().metric, Metric::CoinBalance);
        assert!(by_code("no_such_badge").is_none());
    }
}
