//! `/api/scheduled-reports/*` — CRUD plus an immediate `run-now` dispatch that bypasses
//! the `next_run_at` gate the scheduler otherwise enforces.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::domain::{next_run_at, Frequency, JobKind, ScheduledReport};
use crate::error::{AppError, AppResult};
use crate::services::Services;

#[derive(Deserialize)]
pub struct ScheduledReportInput {
    pub name: String,
    pub report_kind: String,
    pub template_ids: serde_json::Value,
    pub window_days: i32,
    pub ad_account_id: Option<String>,
    pub frequency: String,
    pub hour: i32,
    pub minute: i32,
    pub day_of_week: Option<i32>,
    pub day_of_month: Option<i32>,
    pub timezone: String,
    pub channels: serde_json::Value,
    pub email_to: Option<String>,
    pub im_to: Option<String>,
    pub is_active: bool,
}

fn resolve_recurrence(input: &ScheduledReportInput) -> AppResult<(Frequency, chrono_tz::Tz)> {
    let frequency = Frequency::parse(&input.frequency)
        .ok_or_else(|| AppError::Validation(format!("unknown frequency: {}", input.frequency)))?;
    let tz: chrono_tz::Tz = input
        .timezone
        .parse()
        .map_err(|_| AppError::Validation(format!("unknown timezone: {}", input.timezone)))?;
    if !(0..24).contains(&input.hour) || !(0..60).contains(&input.minute) {
        return Err(AppError::Validation("hour must be 0-23 and minute 0-59".to_string()));
    }
    Ok((frequency, tz))
}

pub async fn list_reports(State(services): State<Arc<Services>>, _user: AuthUser) -> AppResult<Json<Vec<ScheduledReport>>> {
    let reports: Vec<ScheduledReport> = sqlx::query_as("SELECT * FROM scheduled_reports ORDER BY created_at DESC")
        .fetch_all(&services.pool)
        .await?;
    Ok(Json(reports))
}

pub async fn create_report(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Json(input): Json<ScheduledReportInput>,
) -> AppResult<Json<ScheduledReport>> {
    user.require_write()?;
    let (frequency, tz) = resolve_recurrence(&input)?;
    let now = Utc::now();
    let next = next_run_at(
        frequency,
        input.hour as u32,
        input.minute as u32,
        input.day_of_week.map(|d| d as u32),
        input.day_of_month.map(|d| d as u32),
        tz,
        now,
    );

    let report: ScheduledReport = sqlx::query_as(
        "INSERT INTO scheduled_reports (id, name, report_kind, template_ids, window_days, ad_account_id, frequency, hour, minute, \
         day_of_week, day_of_month, timezone, channels, email_to, im_to, is_active, next_run_at, run_count, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, 0, $18) RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&input.name)
    .bind(&input.report_kind)
    .bind(&input.template_ids)
    .bind(input.window_days)
    .bind(&input.ad_account_id)
    .bind(&input.frequency)
    .bind(input.hour)
    .bind(input.minute)
    .bind(input.day_of_week)
    .bind(input.day_of_month)
    .bind(&input.timezone)
    .bind(&input.channels)
    .bind(&input.email_to)
    .bind(&input.im_to)
    .bind(input.is_active)
    .bind(next)
    .bind(now)
    .fetch_one(&services.pool)
    .await?;

    Ok(Json(report))
}

pub async fn update_report(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<ScheduledReportInput>,
) -> AppResult<Json<ScheduledReport>> {
    user.require_write()?;
    let (frequency, tz) = resolve_recurrence(&input)?;
    let now = Utc::now();
    let next = next_run_at(
        frequency,
        input.hour as u32,
        input.minute as u32,
        input.day_of_week.map(|d| d as u32),
        input.day_of_month.map(|d| d as u32),
        tz,
        now,
    );

    let report: ScheduledReport = sqlx::query_as(
        "UPDATE scheduled_reports SET name = $1, report_kind = $2, template_ids = $3, window_days = $4, ad_account_id = $5, \
         frequency = $6, hour = $7, minute = $8, day_of_week = $9, day_of_month = $10, timezone = $11, channels = $12, \
         email_to = $13, im_to = $14, is_active = $15, next_run_at = $16 WHERE id = $17 RETURNING *",
    )
    .bind(&input.name)
    .bind(&input.report_kind)
    .bind(&input.template_ids)
    .bind(input.window_days)
    .bind(&input.ad_account_id)
    .bind(&input.frequency)
    .bind(input.hour)
    .bind(input.minute)
    .bind(input.day_of_week)
    .bind(input.day_of_month)
    .bind(&input.timezone)
    .bind(&input.channels)
    .bind(&input.email_to)
    .bind(&input.im_to)
    .bind(input.is_active)
    .bind(next)
    .bind(&id)
    .fetch_one(&services.pool)
    .await?;

    Ok(Json(report))
}

pub async fn delete_report(State(services): State<Arc<Services>>, user: AuthUser, Path(id): Path<String>) -> AppResult<Json<serde_json::Value>> {
    user.require_write()?;
    let result = sqlx::query("DELETE FROM scheduled_reports WHERE id = $1").bind(&id).execute(&services.pool).await?;
    Ok(Json(serde_json::json!({ "deleted": result.rows_affected() > 0 })))
}

pub async fn run_now(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    user.require_write()?;
    let report: ScheduledReport = sqlx::query_as("SELECT * FROM scheduled_reports WHERE id = $1")
        .bind(&id)
        .fetch_one(&services.pool)
        .await?;
    let job_id = services.job_store.enqueue(JobKind::ScheduledReport, &report.id).await?;
    Ok(Json(serde_json::json!({ "job_id": job_id })))
}
