//! Causeway API Server
//!
//! Main server process:
//! - Connects to `PostgreSQL` and runs migrations
//! - Builds the Paystack client and settlement coordinator
//! - Serves the HTTP API until Ctrl+C
//!
//! # Usage
//!
//! ```bash
//! # Start infrastructure
//! docker compose up -d
//!
//! # Run server
//! PAYSTACK_SECRET_KEY=sk_test_... cargo run --bin server
//! ```

use causeway_core::{SettlementConfig, SettlementCoordinator};
use causeway_gateway::{PaystackConfig, PaystackGateway};
use causeway_postgres::{PostgresInventoryLedger, PostgresReservationStore};
use causeway_web::{AppState, Config, router};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,causeway_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Causeway API server...");

    // Load configuration
    let config = Config::from_env();
    tracing::info!(
        postgres = %config.postgres.url,
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // Connect to PostgreSQL and run migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .connect(&config.postgres.url)
        .await?;

    let records = PostgresReservationStore::new(pool.clone());
    records.migrate().await?;
    tracing::info!("Database migrations applied");

    let inventory = PostgresInventoryLedger::new(pool);

    // Build the Paystack client
    let gateway = PaystackGateway::new(
        PaystackConfig::new(config.paystack.secret_key.clone())
            .with_base_url(config.paystack.base_url.clone()),
    )?;

    let coordinator = SettlementCoordinator::new(
        records,
        inventory,
        gateway,
        SettlementConfig::new(config.settlement.callback_url.clone())
            .with_max_quantity(config.settlement.max_quantity),
    );

    let app = router(AppState::new(coordinator));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Causeway API server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down gracefully...");
        })
        .await?;

    Ok(())
}
