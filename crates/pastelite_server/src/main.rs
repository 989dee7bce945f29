//! Paste API server entrypoint.

use pastelite_core::config::{env_flag_enabled, StorageKind};
use pastelite_core::sweeper::{spawn_expiry_sweeper, sweep_once};
use pastelite_core::{DEFAULT_BACKEND_TIMEOUT_MS, DEFAULT_PORT, DEFAULT_SWEEP_INTERVAL_SECS};
use pastelite_server::{backend, serve_router, AppState, Clock, Config, SystemClock};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CliFlags {
    help: bool,
    purge: bool,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => flags.help = true,
            "--purge-expired" => flags.purge = true,
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pastelite=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_flags = parse_cli_flags(&args)?;

    if cli_flags.help {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store_backend = backend::open(&config, clock.clone())?;
    match config.storage {
        StorageKind::Redb => tracing::info!("Using redb storage at {}", config.db_path),
        StorageKind::Memory => {
            tracing::warn!("Using in-memory storage - pastes are lost on restart")
        }
    }

    if cli_flags.purge {
        let removed = sweep_once(store_backend.as_ref()).await;
        println!("Purged {} expired record(s)", removed);
        store_backend.close().await?;
        return Ok(());
    }

    if config.test_mode {
        tracing::warn!("TEST_MODE enabled - x-test-now-ms request header overrides the clock");
    }

    let sweeper = config
        .sweep_interval
        .map(|every| spawn_expiry_sweeper(store_backend.clone(), every));

    let state = AppState::with_clock(config.clone(), store_backend, clock);
    let store = state.store.clone();

    let allow_public = env_flag_enabled("ALLOW_PUBLIC_ACCESS");
    if allow_public {
        tracing::warn!("Public access enabled - server will accept requests from any origin");
    }

    let bind_addr = pastelite_server::resolve_bind_address(&config, allow_public);
    if !bind_addr.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-localhost address: {} - ensure proper security measures are in place",
            bind_addr
        );
    }

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!("pastelite running at http://{}", actual_addr);

    let serve_result = serve_router(listener, state, allow_public, shutdown_signal()).await;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    if let Err(err) = store.close().await {
        tracing::error!("Failed to close storage backend: {}", err);
    } else {
        tracing::info!("Storage backend closed");
    }

    serve_result?;

    Ok(())
}

fn print_help() {
    println!("pastelite server\n");
    println!("Usage: pastelite [OPTIONS]\n");
    println!("Options:");
    println!("  --purge-expired   Remove records whose TTL has elapsed, then exit");
    println!("  --help            Show this help message");
    println!("\nEnvironment variables:");
    println!("  STORAGE           redb (default) or memory");
    println!("  DB_PATH           Database directory (default: ~/.cache/pastelite/db)");
    println!("  PORT              Server port (default: {})", DEFAULT_PORT);
    println!(
        "  BIND              Override bind address (e.g. 0.0.0.0:{})",
        DEFAULT_PORT
    );
    println!("  MAX_PASTE_SIZE    Maximum paste size in bytes (default: 10MB)");
    println!(
        "  BACKEND_TIMEOUT_MS  Per-call storage timeout (default: {})",
        DEFAULT_BACKEND_TIMEOUT_MS
    );
    println!(
        "  SWEEP_INTERVAL_SECS  Expired-record sweep interval, 0 disables (default: {})",
        DEFAULT_SWEEP_INTERVAL_SECS
    );
    println!("  PUBLIC_URL        Base URL used in share links");
    println!("  TEST_MODE         Honor the x-test-now-ms request header");
    println!("  ALLOW_PUBLIC_ACCESS  Allow CORS from any origin and non-loopback binds");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
