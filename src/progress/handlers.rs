// SPDX-License-Identifier: MIT
//! Progress & achievement RPC handlers.
//!
//! Dispatch entries (see `ipc/mod.rs` dispatch match):
//!
//! ```text
//! "progress.get"         => progress::handlers::get(params, ctx).await,
//! "progress.checkIn"     => progress::handlers::check_in(params, ctx).await,
//! "progress.applyAction" => progress::handlers::apply_action(params, ctx).await,
//! "progress.reset"       => progress::handlers::reset(params, ctx).await,
//! "achievements.list"    => progress::handlers::achievements_list(params, ctx).await,
//! ```

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::AppContext;

use super::model::{ActionType, AchievementDefinition, AchievementUnlock, ProgressRecord};

/// Pull the caller identity out of params. Identity resolution itself is
/// external to the engine — a missing `userId` means no resolvable identity.
fn require_user_id(params: &Value) -> Result<String, EngineError> {
    params
        .get("userId")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or(EngineError::Unauthenticated)
}

fn progress_json(record: &ProgressRecord) -> Value {
    json!({
        "userId":        record.user_id,
        "coins":         record.coins,
        "xp":            record.xp,
        "level":         record.level,
        "totalActions":  record.total_actions,
        "dailyStreak":   record.daily_streak,
        "lastLoginDate": record.last_login_date,
        "lastActivity":  record.last_activity,
        "title":         record.title,
        "createdAt":     record.created_at,
    })
}

fn unlocks_json(unlocks: &[AchievementUnlock]) -> Value {
    Value::Array(
        unlocks
            .iter()
            .map(|u| {
                json!({
                    "code":       u.code,
                    "unlockedAt": u.unlocked_at,
                })
            })
            .collect(),
    )
}

fn definitions_json(defs: &[&'static AchievementDefinition]) -> Value {
    Value::Array(
        defs.iter()
            .map(|d| {
                json!({
                    "code":        d.code,
                    "title":       d.title,
                    "description": d.description,
                    "icon":        d.icon,
                    "rarity":      d.rarity,
                    "reward":      d.reward,
                })
            })
            .collect(),
    )
}

/// Broadcast `achievement.unlocked` push events so connected UIs can pop a
/// toast without polling.
fn broadcast_unlocks(ctx: &AppContext, user_id: &str, defs: &[&'static AchievementDefinition]) {
    for def in defs {
        ctx.broadcaster.broadcast(
            "achievement.unlocked",
            json!({
                "userId": user_id,
                "code":   def.code,
                "title":  def.title,
                "rarity": def.rarity,
                "reward": def.reward,
            }),
        );
    }
}

// ─── progress.get ─────────────────────────────────────────────────────────────

/// `progress.get` — pure read. Creates the zeroed record on first access but
/// grants nothing; callers wanting the bonus-granting read use
/// `progress.checkIn`.
///
/// Params:
/// ```json
/// { "userId": "u-123" }
/// ```
pub async fn get(params: Value, ctx: &AppContext) -> Result<Value> {
    let user_id = require_user_id(&params)?;
    let record = ctx.store.get_or_create(&user_id).await?;
    let unlocks = ctx.ledger.list_for_user(&user_id).await?;

    Ok(json!({
        "progress":     progress_json(&record),
        "achievements": unlocks_json(&unlocks),
    }))
}

// ─── progress.checkIn ─────────────────────────────────────────────────────────

/// `progress.checkIn` — the login-triggered progress query: get-or-create,
/// run the Daily Bonus Evaluator, then the Achievement Evaluator.
///
/// Composed from the split primitives, in order: the bonus commits before
/// any metric is read, so streak and balance achievements see the
/// post-bonus snapshot.
///
/// Response:
/// ```json
/// {
///   "progress":          { … },
///   "achievements":      [ { "code": "first_note", "unlockedAt": "…" } ],
///   "dailyBonusAwarded": true,
///   "newAchievements":   [ … ]
/// }
/// ```
pub async fn check_in(params: Value, ctx: &AppContext) -> Result<Value> {
    let user_id = require_user_id(&params)?;
    let now = Utc::now();

    ctx.store.get_or_create(&user_id).await?;
    let bonus_awarded = ctx.daily.evaluate(&user_id, now).await?;
    if bonus_awarded {
        ctx.broadcaster.broadcast(
            "progress.dailyBonus",
            json!({
                "userId": user_id,
                "coins":  ctx.config.rewards.daily_bonus_coins,
                "xp":     ctx.config.rewards.daily_bonus_xp,
            }),
        );
    }

    let newly = ctx.evaluator.evaluate(&user_id).await?;
    broadcast_unlocks(ctx, &user_id, &newly);

    let record = ctx
        .store
        .get(&user_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(user_id.clone()))?;
    let unlocks = ctx.ledger.list_for_user(&user_id).await?;

    Ok(json!({
        "progress":          progress_json(&record),
        "achievements":      unlocks_json(&unlocks),
        "dailyBonusAwarded": bonus_awarded,
        "newAchievements":   definitions_json(&newly),
    }))
}

// ─── progress.applyAction ─────────────────────────────────────────────────────

/// `progress.applyAction` — apply an action reward, then evaluate
/// achievements.
///
/// Params:
/// ```json
/// {
///   "userId":         "u-123",
///   "actionType":     "create_note",
///   "amount":         10,          // optional explicit override
///   "idempotencyKey": "req-789"    // optional; dedupes retried calls
/// }
/// ```
///
/// Unknown `actionType` strings are not an error — they map to a zero
/// default reward. A replayed `idempotencyKey` returns the current record
/// with `coinsAwarded: 0`.
pub async fn apply_action(params: Value, ctx: &AppContext) -> Result<Value> {
    let user_id = require_user_id(&params)?;

    let action_raw = params
        .get("actionType")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EngineError::Validation("actionType required".to_string()))?;
    let action: ActionType =
        serde_json::from_value(Value::String(action_raw.to_string()))
            .unwrap_or(ActionType::Other);

    // Reject malformed amounts before any mutation.
    let explicit = match params.get("amount") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_u64().ok_or_else(|| {
            EngineError::Validation("amount must be a non-negative integer".to_string())
        })?),
    };

    let idempotency_key = params.get("idempotencyKey").and_then(|v| v.as_str());

    // Amount resolution: explicit > config override > built-in default.
    let amount = explicit
        .or_else(|| ctx.config.rewards.actions.get(action.as_str()).copied())
        .unwrap_or_else(|| action.default_coins());

    // SQLite integers are signed 64-bit; a larger amount would wrap negative
    // inside the additive update and debit the balance instead.
    if i64::try_from(amount).is_err() {
        return Err(EngineError::Validation("amount out of range".to_string()).into());
    }

    let (record, applied) = ctx
        .store
        .apply_action_reward(&user_id, amount, action.counter_metric(), idempotency_key)
        .await?;

    // Achievements are evaluated against the committed post-mutation state.
    // A deduplicated retry changed nothing, but an earlier crash may have
    // left thresholds crossed — evaluating is harmless either way.
    let newly = ctx.evaluator.evaluate(&user_id).await?;
    broadcast_unlocks(ctx, &user_id, &newly);

    let record = if newly.is_empty() {
        record
    } else {
        ctx.store
            .get(&user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(user_id.clone()))?
    };

    Ok(json!({
        "progress":        progress_json(&record),
        "newAchievements": definitions_json(&newly),
        "coinsAwarded":    if applied { amount } else { 0 },
    }))
}

// ─── progress.reset ───────────────────────────────────────────────────────────

/// `progress.reset` — administrative wipe of a user's record, unlock ledger,
/// counters and dedup keys. Errors with user-not-found when no record
/// exists.
pub async fn reset(params: Value, ctx: &AppContext) -> Result<Value> {
    let user_id = require_user_id(&params)?;
    ctx.store.reset(&user_id).await?;
    Ok(json!({ "reset": true }))
}

// ─── achievements.list ────────────────────────────────────────────────────────

/// `achievements.list` — the full catalog with the user's unlock state and a
/// progress fraction for UI bars.
///
/// Response (one entry per catalog definition):
/// ```json
/// [
///   {
///     "code":        "first_note",
///     "title":       "First Note",
///     "description": "Wrote your first note.",
///     "icon":        "📝",
///     "rarity":      "common",
///     "metric":      "notes_written",
///     "target":      1,
///     "unlocked":    true,
///     "unlockedAt":  "2026-02-25T10:30:00Z",
///     "progress":    1.0
///   },
///   …
/// ]
/// ```
pub async fn achievements_list(params: Value, ctx: &AppContext) -> Result<Value> {
    let user_id = require_user_id(&params)?;
    let statuses = ctx.evaluator.statuses(&user_id).await?;

    let result: Vec<Value> = statuses
        .into_iter()
        .map(|s| {
            json!({
                "code":        s.code,
                "title":       s.title,
                "description": s.description,
                "icon":        s.icon,
                "rarity":      s.rarity,
                "metric":      s.metric,
                "target":      s.target,
                "unlocked":    s.unlocked,
                "unlockedAt":  s.unlocked_at,
                "progress":    s.progress,
            })
        })
        .collect();

    Ok(Value::Array(result))
}
