use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tenant_console_core::config::{self, AppConfig};
use tenant_console_core::datasource::{probe, PgBackendFactory, PoolManager};
use tenant_console_core::{app, AppState};

#[derive(Parser)]
#[command(name = "tenant-console")]
#[command(about = "Access control and admin data service for the tenant console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Port to listen on, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the data source health probe once and print the result
    ProbeDataSource,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = config::config();
    tracing::info!("Starting tenant console in {:?} mode", config.environment);

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, port).await,
        Command::ProbeDataSource => probe_data_source(config).await,
    }
}

async fn serve(config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    config.validate()?;

    let database_url = config.server.database_url.as_deref().context("DATABASE_URL is not set")?;
    let tenant_pool = PgPoolOptions::new()
        .max_connections(config.server.database_max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to the tenant database")?;

    let state = AppState::from_config(config, tenant_pool.clone());
    let data_source = state.data_source.clone();

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Tenant console listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    data_source.close_pool().await;
    tenant_pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn probe_data_source(config: &AppConfig) -> anyhow::Result<()> {
    let manager = PoolManager::new(config.data_source.clone(), Arc::new(PgBackendFactory));
    let result = probe::run(&manager, &config.data_source.sample_query).await;
    manager.close_pool().await;

    match result {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::json!({ "success": false, "error": e.to_string() }));
            anyhow::bail!("data source probe failed: {}", e)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
