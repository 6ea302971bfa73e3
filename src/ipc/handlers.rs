// SPDX-License-Identifier: MIT
//! Daemon-level RPC handlers — liveness and status.

use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

/// `daemon.ping` — liveness echo.
pub async fn ping(_params: Value, _ctx: &AppContext) -> Result<Value> {
    Ok(json!({ "pong": true, "version": env!("CARGO_PKG_VERSION") }))
}

/// `daemon.status` — uptime and configuration snapshot.
pub async fn status(_params: Value, ctx: &AppContext) -> Result<Value> {
    Ok(json!({
        "version":    env!("CARGO_PKG_VERSION"),
        "uptimeSecs": ctx.started_at.elapsed().as_secs(),
        "port":       ctx.config.port,
        "dataDir":    ctx.config.data_dir.display().to_string(),
    }))
}
