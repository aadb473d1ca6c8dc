//! facegate-node - Main entry point
//!
//! Start-up order: configuration, database, recognition pool, services,
//! HTTP server. Shutdown runs the same steps backwards once the server has
//! drained.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use facegate_common::config::TomlConfig;
use facegate_common::db::init_database;
use facegate_common::time::{secs_to_duration, SystemClock};
use facegate_node::recognition::{BaselineEngine, RecognitionPool};
use facegate_node::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for facegate-node
#[derive(Parser, Debug)]
#[command(name = "facegate-node")]
#[command(about = "Access-control node for face-recognition gates")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "facegate.toml", env = "FACEGATE_CONFIG")]
    config: PathBuf,

    /// Path to SQLite database (overrides config)
    #[arg(short, long, env = "FACEGATE_DATABASE")]
    database: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "FACEGATE_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long, env = "FACEGATE_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load(&args.config).context("Failed to load configuration")?;
    config.apply_overrides(args.database, args.bind, args.port);

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "facegate_node={level},facegate_common={level},tower_http={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting facegate-node v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );
    info!("Database: {}", config.database_path.display());

    let db = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let engine = Arc::new(BaselineEngine::new(
        config.recognition.descriptor_len,
        config.recognition.tolerance,
    ));
    let pool = Arc::new(RecognitionPool::new(
        config.recognition.workers,
        config.recognition.queue_capacity,
    ));
    info!(
        "Recognition pool: {} workers, queue capacity {}",
        pool.size(),
        config.recognition.queue_capacity
    );

    let state = AppState::new(
        db.clone(),
        engine,
        pool.clone(),
        Arc::new(SystemClock),
        secs_to_duration(config.room_token_lifetime_secs),
    );
    let registry = state.registry.clone();

    if let Err(e) = registry.init_all().await {
        registry.deinit_all().await;
        pool.shutdown().await;
        db.close().await;
        return Err(e).context("Failed to initialize services");
    }

    let app = build_router(state);

    let addr = config.listen_address();
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let received = stop_signal().await;
            info!("{} received, draining connections", received);
        })
        .await;

    registry.deinit_all().await;
    pool.shutdown().await;
    db.close().await;

    served.context("Server error")?;
    info!("Shutdown complete");
    Ok(())
}

/// Name of the first stop signal received
///
/// A signal that cannot be hooked is logged and never fires; the other one
/// still stops the server.
async fn stop_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => "Ctrl+C",
        _ = terminate => "SIGTERM",
    }
}
