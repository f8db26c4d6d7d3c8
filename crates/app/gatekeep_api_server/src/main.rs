//! Gatekeep API server binary.
//!
//! Reads configuration from the environment (and `.env`), runs migrations
//! and serves the API until interrupted.

use std::sync::Arc;

use clap::Parser;
use gatekeep_api::config::ApiConfig;
use gatekeep_core::auth::oauth::GoogleProvider;
use gatekeep_core::store::postgres::PgStore;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI arguments for the API server. Flags override the environment.
#[derive(Parser, Debug)]
#[command(name = "gatekeep_api_server", about = "Gatekeep session and token gateway")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:1234")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/gatekeep"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gatekeep_api=debug,gatekeep_core=debug")),
        )
        .init();

    let args = Args::parse();
    let config = ApiConfig {
        bind_addr: args.bind_addr,
        database_url: args.database_url,
        ..ApiConfig::from_env()?
    };
    info!(config = ?config, "starting gatekeep_api_server");

    info!(max_connections = args.max_connections, "configuring connection pool");
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    gatekeep_core::migrate::migrate(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let provider = Arc::new(GoogleProvider::new(config.google.clone())?);
    let state = gatekeep_api::AppState::new(config.clone(), store.clone(), store, provider)?;
    let app = gatekeep_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler; serve until the process is killed.
        std::future::pending::<()>().await;
    }
}
