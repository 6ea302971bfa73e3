// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::{Parser, Subcommand};
use questd::{auth, config::DaemonConfig, ipc::event::EventBroadcaster, storage::Storage, AppContext};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "questd",
    about = "Quest engine — progress & achievement daemon for the life dashboard",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON-RPC WebSocket server port
    #[arg(long, env = "QUESTD_PORT")]
    port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "QUESTD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "QUESTD_LOG")]
    log: Option<String>,

    /// Bind address for the WebSocket server (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "QUESTD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "QUESTD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon server (default when no subcommand given).
    ///
    /// Runs questd in the foreground.
    ///
    /// Examples:
    ///   questd serve
    ///   questd
    Serve,
    /// Print the local auth token clients must present on connect.
    Token,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── Logging setup ────────────────────────────────────────────────────────
    // Init once — must happen before any tracing calls.
    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    let log_format =
        std::env::var("QUESTD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref(), &log_format);

    match args.command {
        Some(Command::Token) => {
            let config = DaemonConfig::new(None, args.data_dir, Some("error".to_string()), None);
            let token = auth::get_or_create_token(&config.data_dir)?;
            println!("{token}");
        }
        None | Some(Command::Serve) => {
            run_server(args.port, args.data_dir, args.log, args.bind_address).await?;
        }
    }

    Ok(())
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("questd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            // Fall back to stdout-only — don't panic on a bad log path.
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}

async fn run_server(
    port: Option<u16>,
    data_dir: Option<std::path::PathBuf>,
    log: Option<String>,
    bind_address: Option<String>,
) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "questd starting");

    let config = Arc::new(DaemonConfig::new(port, data_dir, log, bind_address));
    info!(
        data_dir = %config.data_dir.display(),
        port = config.port,
        "config loaded"
    );

    let storage = Arc::new(
        Storage::new_with_slow_query(
            &config.data_dir,
            config.observability.slow_query_threshold_ms,
        )
        .await?,
    );

    let auth_token = match auth::get_or_create_token(&config.data_dir) {
        Ok(t) => t,
        Err(e) => {
            warn!(err = %e, "could not create auth token — running without connection auth");
            String::new()
        }
    };

    let broadcaster = Arc::new(EventBroadcaster::new());
    let ctx = Arc::new(AppContext::assemble(
        config,
        storage,
        broadcaster,
        auth_token,
    ));

    // ── Startup recovery ─────────────────────────────────────────────────────
    // A crash between a ledger insert and its reward transaction leaves the
    // unlock row with reward_applied = 0; credit those now.
    match ctx.dispatcher.redispatch_pending().await {
        Ok(0) => {}
        Ok(n) => info!(count = n, "re-dispatched pending achievement rewards"),
        Err(e) => warn!(err = %e, "pending reward recovery failed"),
    }

    questd::ipc::run(ctx).await
}
