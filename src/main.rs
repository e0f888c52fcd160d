//! Circulation Server - borrowing lifecycle engine
//!
//! REST API server plus the background sweep scheduler.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circulation_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{clock::SystemClock, scheduler::Scheduler, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("circulation_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Circulation Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let repository = Repository::new(pool);

    // Settings row must exist before the first request or sweep
    let settings = repository.settings.get_or_init().await?;
    tracing::info!(
        "Loaded circulation settings: loan {} days, limit {} books, fine {}/day",
        settings.loan_period_days,
        settings.max_books_per_user,
        settings.fine_per_day
    );

    let services = Services::new(repository, config.email.clone(), Arc::new(SystemClock));

    let scheduler = if config.scheduler.enabled {
        Some(Scheduler::spawn(services.circulation.clone(), &config.scheduler))
    } else {
        tracing::info!("Background scheduler disabled");
        None
    };

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
