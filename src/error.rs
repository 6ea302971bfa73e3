// SPDX-License-Identifier: MIT
//! Engine error taxonomy.
//!
//! Every fallible engine operation returns one of these. The IPC layer
//! downcasts them out of `anyhow::Error` to pick the JSON-RPC error code;
//! everything else is reported as an internal error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No resolvable identity — the caller did not supply a `userId` (or the
    /// connection failed the auth challenge). No mutation is attempted.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The referenced user has no progress record where one is required
    /// (e.g. `progress.reset` on an unknown user). Distinct from "progress
    /// not yet created", which is handled by get-or-create.
    #[error("user not found: {0}")]
    NotFound(String),

    /// Malformed input, rejected before any mutation.
    #[error("invalid params: {0}")]
    Validation(String),

    /// A metric provider is not registered or failed to produce a value.
    /// Never fatal to a whole evaluation batch — the evaluator skips the
    /// affected achievement and retries on the next call.
    #[error("metric provider unavailable: {0}")]
    MetricUnavailable(String),

    /// Persistence layer failure. Retryable; mutations are all-or-nothing,
    /// so no partial state is left behind.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
