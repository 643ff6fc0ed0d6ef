//! `worker` — the bounded-concurrency pool that executes export/analyze/archive/
//! scheduled-report jobs claimed from the Job Store. Run as many instances as needed;
//! `claim_next` serializes claims at the database.

use ad_ops_hub::jobs::{WorkerContext, WorkerPool};
use ad_ops_hub::process_config::ProcessConfig;
use ad_ops_hub::services;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "worker", about = "Ad Ops Hub — background job worker pool")]
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

    info!(concurrency = config.worker_concurrency, "starting worker");

    let services = services::bootstrap(&config).await?;
    let context = WorkerContext {
        store: services.job_store.clone(),
        pool: services.pool.clone(),
        upstream: services.upstream.clone(),
        ai: services.ai.clone(),
        storage: services.storage.clone(),
        fanout: services.fanout.clone(),
        reports_dir: services.reports_dir.clone(),
    };

    let cancellation = CancellationToken::new();
    let shutdown_token = cancellation.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
        info!("shutdown signal received");
        shutdown_token.cancel();
    });

    let pool = WorkerPool::new(context, config.worker_concurrency, cancellation);
    pool.run().await;

    info!("worker shut down gracefully");
    Ok(())
}
