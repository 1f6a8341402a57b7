use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use ncnews::api::{create_router, AppState};
use ncnews::config::Config;
use ncnews::feed::FeedFetcher;
use ncnews::storage::{Database, DatabaseError};
use ncnews::sync::{seed_store, spawn_scheduler, Synchronizer};

#[derive(Parser, Debug)]
#[command(
    name = "ncnews",
    about = "RSS/Atom aggregator serving the Nextcloud News API"
)]
struct Args {
    /// Configuration file
    #[arg(
        long,
        value_name = "FILE",
        env = "RSS_CONFIG_FILE",
        default_value = "feeds.toml"
    )]
    config: PathBuf,

    /// Run a single sync pass in the foreground and exit
    #[arg(long)]
    sync_once: bool,
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Arc::new(
        Config::load(&args.config)
            .with_context(|| format!("Failed to load config from {}", args.config.display()))?,
    );

    let db = match Database::open(&config.database).await {
        Ok(db) => db,
        Err(DatabaseError::Locked) => {
            eprintln!(
                "Error: database {} is locked. Is another ncnews instance running?",
                config.database
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    seed_store(&db, &config)
        .await
        .context("Failed to seed feeds from configuration")?;

    let fetcher = FeedFetcher::new(config.fetch_timeout(), config.fetch_retries)
        .context("Failed to create HTTP client")?;
    let synchronizer = Synchronizer::new(db.clone(), fetcher, config.clone());

    if args.sync_once {
        synchronizer.sync_all().await;
        return Ok(());
    }

    let scheduler = spawn_scheduler(synchronizer, config.poll_interval());

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "Serving Nextcloud News API");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Err(e) = scheduler.stop().await {
        tracing::warn!(error = %e, "Scheduler did not stop cleanly");
    }

    Ok(())
}
