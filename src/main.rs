use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mda_admin::common::rate_limit::start_cleanup_task;
use mda_admin::model::Config;
use mda_admin::seed::{SeedOutcome, ensure_super_admin};
use mda_admin::store::Database;
use mda_admin::{AppState, create_app};

/// MDA reporting admin API server
#[derive(Parser, Debug)]
#[command(name = "mda-admin", version, about)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = Config::default_config_path())]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the configured superadmin and exit
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber so RUST_LOG may come from .env
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let mut config = Config::load(&args.config)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    tracing::info!(path = %args.config, environment = %config.environment, "Configuration loaded");

    let db = Database::open(&config.database_path)
        .with_context(|| format!("Failed to open database: {}", config.database_path))?;

    let outcome = ensure_super_admin(&db, &config).await?;
    if outcome == SeedOutcome::NotConfigured {
        tracing::warn!("No superadmin credentials configured, skipping bootstrap");
    }
    if matches!(args.command, Some(Command::Seed)) {
        return Ok(());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let cleanup_interval = Duration::from_secs(config.rate_limit_window_secs.max(60));
    let state = AppState::new(config, db);
    start_cleanup_task(Arc::clone(&state.limiter), cleanup_interval);

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
