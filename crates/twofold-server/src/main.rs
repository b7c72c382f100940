mod config;

use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use twofold_api::AppStateInner;
use twofold_api::audio::AudioStorage;
use twofold_db::{Database, StoreError};

use crate::config::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present, before clap reads the environment
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "twofold=debug,twofold_api=debug,twofold_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(&cli).await,
        Some(Command::InitDb) => {
            // Opening runs the migrations and seeding
            Database::open(&cli.db_path)?;
            info!("Database ready at {}", cli.db_path.display());
            Ok(())
        }
        Some(Command::Reset { force }) => reset(&cli, force),
    }
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let db = Database::open(&cli.db_path)?;
    let audio = AudioStorage::new(cli.audio_dir.clone()).await?;

    let state = Arc::new(AppStateInner { db, audio });

    let app = twofold_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = cli.addr()?;
    info!("Twofold server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn reset(cli: &Cli, force: bool) -> anyhow::Result<()> {
    // Not `open`: migrating first would fail on a store in the old layout
    let db = Database::open_unmigrated(&cli.db_path)?;

    match db.reset(force, twofold_db::today()) {
        Ok(()) => {
            info!("Store at {} reset", cli.db_path.display());
            Ok(())
        }
        Err(e @ StoreError::ResetRefused { .. }) => {
            warn!("{}", e);
            anyhow::bail!("{e}; rerun with --force to discard it")
        }
        Err(e) => Err(e.into()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
