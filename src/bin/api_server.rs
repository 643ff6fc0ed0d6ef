//! `api-server` — the bearer-authenticated Axum surface. Stateless beyond the shared
//! `Services` bundle; any number of instances may run behind a load balancer.

use std::net::SocketAddr;

use ad_ops_hub::process_config::ProcessConfig;
use ad_ops_hub::services;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "api-server", about = "Ad Ops Hub — HTTP API surface")]
struct CliArgs {
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, short)]
    port: Option<u16>,

    #[arg(long)]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,ad_ops_hub=debug")),
        )
        .init();

    let args = CliArgs::parse();
    let config = ProcessConfig::from_env(args.database_url, args.bind_address, args.port)?;

    if config.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL must be set via --database-url or DATABASE_URL env var");
    }

    info!(bind = %config.bind_address, "starting api-server");

    let services = services::bootstrap(&config).await?;
    let app = ad_ops_hub::api::build_router(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "api-server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("api-server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    info!("shutdown signal received");
}
