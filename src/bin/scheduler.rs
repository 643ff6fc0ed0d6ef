//! `scheduler` — the single-leader periodic driver for rule checks and scheduled-report
//! dispatch. Exactly one instance may run per deployment; running more violates
//! cooldown correctness (see the module doc on [`ad_ops_hub::scheduler`]).

use std::sync::Arc;

use ad_ops_hub::process_config::ProcessConfig;
use ad_ops_hub::scheduler::{self, SchedulerContext};
use ad_ops_hub::services;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "scheduler", about = "Ad Ops Hub — rule check and scheduled report beat")]
struct CliArgs {
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
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
    let config = ProcessConfig::from_env(args.database_url, None, None)?;

    if config.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL must be set via --database-url or DATABASE_URL env var");
    }

    info!("starting scheduler");

    let services = services::bootstrap(&config).await?;
    let context = Arc::new(SchedulerContext {
        pool: services.pool.clone(),
        upstream: services.upstream.clone(),
        fanout: services.fanout.clone(),
        job_store: services.job_store.clone(),
    });

    let cancellation = CancellationToken::new();
    let shutdown_token = cancellation.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
        info!("shutdown signal received");
        shutdown_token.cancel();
    });

    scheduler::run(context, cancellation).await;

    info!("scheduler shut down gracefully");
    Ok(())
}
