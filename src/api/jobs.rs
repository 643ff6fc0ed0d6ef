//! `/api/jobs/*` — enqueue, inspect, download, and delete background work.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::auth::AuthUser;
use crate::domain::JobKind;
use crate::error::{AppError, AppResult};
use crate::services::Services;

pub async fn enqueue_export(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Path(recipe_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    user.require_write()?;
    let job_id = services.job_store.enqueue(JobKind::Export, &recipe_id).await?;
    Ok(Json(serde_json::json!({ "job_id": job_id })))
}

pub async fn enqueue_analyze(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Path(recipe_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    user.require_write()?;
    let job_id = services.job_store.enqueue(JobKind::Analyze, &recipe_id).await?;
    Ok(Json(serde_json::json!({ "job_id": job_id })))
}

pub async fn get_job(
    State(services): State<Arc<Services>>,
    _user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Json<crate::domain::Job>> {
    Ok(Json(services.job_store.get(&job_id).await?))
}

pub async fn delete_job(
    State(services): State<Arc<Services>>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    user.require_write()?;
    let job = services.job_store.delete(&job_id).await?;
    if let Some(job) = &job {
        for path in [job.output_path.as_deref(), job.auxiliary_output_path.as_deref()].into_iter().flatten() {
            let _ = std::fs::remove_file(path);
        }
    }
    Ok(Json(serde_json::json!({ "deleted": job.is_some() })))
}

pub async fn download_job(
    State(services): State<Arc<Services>>,
    _user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Response> {
    let job = services.job_store.get(&job_id).await?;
    let path = job.output_path.ok_or_else(|| AppError::NotFound("job has no output file".to_string()))?;
    let bytes = std::fs::read(&path).map_err(|e| AppError::Internal(e.to_string()))?;
    let name = job.output_name.unwrap_or_else(|| "report".to_string());
    Ok((
        [(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\""))],
        bytes,
    )
        .into_response())
}

pub async fn job_pdf(
    State(services): State<Arc<Services>>,
    _user: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Response> {
    let job = services.job_store.get(&job_id).await?;
    let path = job
        .auxiliary_output_path
        .ok_or_else(|| AppError::NotFound("job has no rendered PDF".to_string()))?;
    let bytes = std::fs::read(&path).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response())
}
