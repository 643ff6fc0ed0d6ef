//! Worker Pool — a bounded-concurrency loop polling the Job Store, dispatching claimed
//! jobs to the task implementation for their `kind`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::ai::AiAdapter;
use crate::domain::report::SavedReportRecipe;
use crate::domain::{JobKind, ScheduledReport};
use crate::error::{AppError, AppResult};
use crate::notify::{AlertPayload, DefaultNotificationAdapter, NotificationFanout};
use crate::object_storage::ObjectStorage;
use crate::upstream::UpstreamClient;

use super::store::JobStore;
use super::{analyze, archive, export};

const POLL_INTERVAL_WHEN_IDLE: Duration = Duration::from_secs(2);

pub struct WorkerContext {
    pub store: JobStore,
    pub pool: PgPool,
    pub upstream: UpstreamClient,
    pub ai: Arc<dyn AiAdapter>,
    pub storage: ObjectStorage,
    pub fanout: NotificationFanout<DefaultNotificationAdapter>,
    pub reports_dir: PathBuf,
}

pub struct WorkerPool {
    context: Arc<WorkerContext>,
    semaphore: Arc<Semaphore>,
    cancellation: CancellationToken,
}

impl WorkerPool {
    pub fn new(context: WorkerContext, concurrency: usize, cancellation: CancellationToken) -> Self {
        Self {
            context: Arc::new(context),
            semaphore: Arc::new(Semaphore::new(concurrency)),
            cancellation,
        }
    }

    /// Runs until the cancellation token fires. Each claimed job runs on its own task,
    /// gated by the shared semaphore so in-flight task count never exceeds `concurrency`.
    pub async fn run(&self) {
        loop {
            if self.cancellation.is_cancelled() {
                return;
            }

            let permit = match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    sleep(POLL_INTERVAL_WHEN_IDLE).await;
                    continue;
                }
            };

            match self.context.store.claim_next().await {
                Ok(Some(job)) => {
                    let context = self.context.clone();
                    let cancellation = self.cancellation.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        run_job(context, job.id, job.kind, job.subject_id, cancellation).await;
                    });
                }
                Ok(None) => {
                    drop(permit);
                    sleep(POLL_INTERVAL_WHEN_IDLE).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to claim next job");
                    drop(permit);
                    sleep(POLL_INTERVAL_WHEN_IDLE).await;
                }
            }
        }
    }
}

async fn fetch_recipe(pool: &PgPool, recipe_id: &str) -> AppResult<SavedReportRecipe> {
    sqlx::query_as::<_, SavedReportRecipe>("SELECT * FROM saved_report_recipes WHERE id = $1")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("saved report recipe {recipe_id} not found")))
}

async fn fetch_scheduled_report(pool: &PgPool, report_id: &str) -> AppResult<ScheduledReport> {
    sqlx::query_as::<_, ScheduledReport>("SELECT * FROM scheduled_reports WHERE id = $1")
        .bind(report_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("scheduled report {report_id} not found")))
}

async fn insert_scheduled_report_log(
    pool: &PgPool,
    report_id: &str,
    status: &str,
    started_at: chrono::DateTime<Utc>,
    error_message: Option<&str>,
    channels_delivered: &serde_json::Value,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO scheduled_report_log (id, scheduled_report_id, status, started_at, completed_at, summary_data, analysis_text, error_message, channels_delivered) \
         VALUES ($1, $2, $3, $4, $5, NULL, NULL, $6, $7)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(report_id)
    .bind(status)
    .bind(started_at)
    .bind(Utc::now())
    .bind(error_message)
    .bind(channels_delivered)
    .execute(pool)
    .await?;
    Ok(())
}

/// Runs a scheduled report's export and, on success, notifies its configured
/// destinations. A `ScheduledReportLog` row is written either way — this is the "per
/// execution" record the report's run history is built from.
async fn run_scheduled_report(
    context: &WorkerContext,
    job_id: &str,
    report_id: &str,
    progress: impl FnMut(i32),
) -> AppResult<TaskOutput> {
    let started_at = Utc::now();
    let report = fetch_scheduled_report(&context.pool, report_id).await?;
    let recipe = SavedReportRecipe {
        id: report.id.clone(),
        name: report.name.clone(),
        template_ids: report.template_ids.clone(),
        window_days: report.window_days,
        ad_account_id: report.ad_account_id.clone(),
        created_at: report.created_at,
    };

    let export_result = export::run(job_id, &recipe, &context.reports_dir, &context.upstream, progress).await;

    match export_result {
        Ok(output) => {
            let message = format!("Scheduled report '{}' is ready: {}", report.name, output.output_name);
            let delivery = context
                .fanout
                .dispatch(&AlertPayload {
                    title: Some(format!("Scheduled report: {}", report.name)),
                    message,
                    email_to: report.email_to.clone(),
                    im_to: report.im_to.clone(),
                })
                .await;
            insert_scheduled_report_log(
                &context.pool,
                report_id,
                "success",
                started_at,
                None,
                &serde_json::to_value(&delivery).unwrap_or_default(),
            )
            .await?;
            Ok((None, Some(output.output_path), Some(output.output_name), None))
        }
        Err(e) => {
            insert_scheduled_report_log(&context.pool, report_id, "failed", started_at, Some(&e.to_string()), &serde_json::json!({})).await?;
            Err(e)
        }
    }
}

async fn run_job(context: Arc<WorkerContext>, job_id: String, kind: JobKind, subject_id: String, cancellation: CancellationToken) {
    // Idempotency: a job that somehow reached this point already in a terminal state
    // (e.g. a duplicate dispatch after a claim race) is a no-op.
    match context.store.is_terminal(&job_id).await {
        Ok(true) => return,
        Ok(false) => {}
        Err(e) => {
            tracing::error!(job_id, error = %e, "failed to check job terminal state");
            return;
        }
    }

    let store = context.store.clone();
    let result = dispatch(&context, &job_id, kind, &subject_id, cancellation).await;

    match result {
        Ok((result_text, output_path, output_name, auxiliary_output_path)) => {
            if let Err(e) = store
                .complete(&job_id, result_text.as_deref(), output_path.as_deref(), output_name.as_deref(), auxiliary_output_path.as_deref())
                .await
            {
                tracing::error!(job_id, error = %e, "failed to persist job completion");
            }
        }
        Err(e) => {
            let message = match &e {
                AppError::UpstreamTransient => super::store::RATE_LIMIT_JOB_MESSAGE.to_string(),
                other => other.to_string(),
            };
            if let Err(store_err) = store.fail(&job_id, &message).await {
                tracing::error!(job_id, error = %store_err, "failed to persist job failure");
            }
        }
    }
}

type TaskOutput = (Option<String>, Option<String>, Option<String>, Option<String>);

async fn dispatch(
    context: &WorkerContext,
    job_id: &str,
    kind: JobKind,
    subject_id: &str,
    cancellation: CancellationToken,
) -> AppResult<TaskOutput> {
    let store = context.store.clone();
    let progress = move |job_id: String, store: JobStore| {
        move |p: i32| {
            let store = store.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move {
                if let Err(e) = store.set_progress(&job_id, p).await {
                    tracing::warn!(job_id, error = %e, "failed to persist job progress");
                }
            });
        }
    };

    match kind {
        JobKind::Export => {
            if cancellation.is_cancelled() {
                return Err(AppError::Internal("worker shutting down".to_string()));
            }
            let recipe = fetch_recipe(&context.pool, subject_id).await?;
            let output = export::run(job_id, &recipe, &context.reports_dir, &context.upstream, progress(job_id.to_string(), store)).await?;
            Ok((None, Some(output.output_path), Some(output.output_name), None))
        }
        JobKind::Analyze => {
            let recipe = fetch_recipe(&context.pool, subject_id).await?;
            let output = analyze::run(job_id, &recipe, &context.reports_dir, &context.upstream, context.ai.as_ref(), progress(job_id.to_string(), store)).await?;
            Ok((Some(output.result_text), None, None, output.auxiliary_output_path))
        }
        JobKind::Archive => {
            let output = archive::run(&context.reports_dir, &context.storage, progress(job_id.to_string(), store)).await?;
            let summary = format!("Uploaded {} file(s); {} failure(s).", output.uploaded_count, output.failed.len());
            Ok((Some(summary), None, None, None))
        }
        JobKind::ScheduledReport => run_scheduled_report(context, job_id, subject_id, progress(job_id.to_string(), store)).await,
    }
}
