// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4600;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── RewardsConfig ────────────────────────────────────────────────────────────

/// Reward tuning (`[rewards]` in config.toml).
///
/// `actions` overrides the built-in per-action coin table by wire name,
/// e.g. `actions = { create_note = 12 }`. Unlisted actions keep their
/// built-in defaults; unknown action names are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Coins granted by the once-per-day login bonus (default: 20).
    pub daily_bonus_coins: u64,
    /// XP granted by the once-per-day login bonus (default: 20).
    pub daily_bonus_xp: u64,
    /// Per-action coin overrides, keyed by action wire name.
    pub actions: HashMap<String, u64>,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            daily_bonus_coins: 20,
            daily_bonus_xp: 20,
            actions: HashMap::new(),
        }
    }
}

// ─── ObservabilityConfig ─────────────────────────────────────────────────────

/// Daemon observability configuration (`[observability]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log SQLite queries that exceed this threshold (milliseconds). Default: 100.
    /// Set to 0 to disable slow query logging.
    pub slow_query_threshold_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { slow_query_threshold_ms: 100 }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// WebSocket server port (default: 4600).
    port: Option<u16>,
    /// Log level filter string, e.g. "debug", "info,questd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured).
    log_format: Option<String>,
    /// Bind address for the WebSocket server (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Reward tuning (`[rewards]`).
    rewards: Option<RewardsConfig>,
    /// Observability configuration (`[observability]`).
    observability: Option<ObservabilityConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    /// Bind address for the WebSocket server (QUESTD_BIND env var).
    pub bind_address: String,
    /// Reward tuning — daily bonus amounts and per-action overrides.
    pub rewards: RewardsConfig,
    /// Observability: slow query threshold.
    pub observability: ObservabilityConfig,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let log_format = std::env::var("QUESTD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let bind_address = bind_address
            .or(std::env::var("QUESTD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let rewards = toml.rewards.unwrap_or_default();
        let observability = toml.observability.unwrap_or_default();

        Self {
            port,
            data_dir,
            log,
            log_format,
            bind_address,
            rewards,
            observability,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/questd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("questd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/questd or ~/.local/share/questd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("questd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("questd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\questd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("questd");
        }
    }
    // Fallback
    PathBuf::from(".questd")
}
