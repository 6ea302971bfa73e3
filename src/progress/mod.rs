// SPDX-License-Identifier: MIT
//! The progress & achievement engine: converts user actions into coins/XP,
//! derives levels, grants the once-per-day login bonus, and unlocks one-shot
//! achievements across heterogeneous activity metrics.

pub mod daily;
pub mod dispatch;
pub mod evaluator;
pub mod handlers;
pub mod ledger;
pub mod level;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod store;
