//! Job Store — PostgreSQL-backed durable job table. Claiming uses
//! `SELECT ... FOR UPDATE SKIP LOCKED` so multiple worker processes can run against the
//! same table without double-executing a job.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Job, JobKind, JobStatus};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct JobStore {
    pool: PgPool,
}

impl JobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, kind: JobKind, subject_id: &str) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO jobs (id, kind, subject_id, status, progress, created_at) \
             VALUES ($1, $2, $3, 'pending', 0, NOW())",
        )
        .bind(&id)
        .bind(kind)
        .bind(subject_id)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn get(&self, job_id: &str) -> AppResult<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))
    }

    /// Atomically claims the oldest pending job, marking it running. Returns `None`
    /// when the queue is empty — callers should back off before polling again.
    pub async fn claim_next(&self) -> AppResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = 'running', progress = 0, updated_at = NOW()
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'pending'
                ORDER BY created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    pub async fn set_progress(&self, job_id: &str, progress: i32) -> AppResult<()> {
        let current: (i32,) = sqlx::query_as("SELECT progress FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?;
        let clamped = crate::domain::job::clamped_progress(current.0, progress);
        sqlx::query("UPDATE jobs SET progress = $1, updated_at = NOW() WHERE id = $2")
            .bind(clamped)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn complete(
        &self,
        job_id: &str,
        result_text: Option<&str>,
        output_path: Option<&str>,
        output_name: Option<&str>,
        auxiliary_output_path: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', progress = 100, result_text = $1, \
             output_path = $2, output_name = $3, auxiliary_output_path = $4, updated_at = NOW() \
             WHERE id = $5",
        )
        .bind(result_text)
        .bind(output_path)
        .bind(output_name)
        .bind(auxiliary_output_path)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail(&self, job_id: &str, error_message: &str) -> AppResult<()> {
        sqlx::query("UPDATE jobs SET status = 'failed', error_message = $1, updated_at = NOW() WHERE id = $2")
            .bind(error_message)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, job_id: &str) -> AppResult<Option<Job>> {
        let job = self.get(job_id).await.ok();
        sqlx::query("DELETE FROM jobs WHERE id = $1").bind(job_id).execute(&self.pool).await?;
        Ok(job)
    }

    pub async fn is_terminal(&self, job_id: &str) -> AppResult<bool> {
        Ok(self.get(job_id).await?.status.is_terminal())
    }
}

/// User-actionable translation of an upstream rate limit into a job-row error message.
pub const RATE_LIMIT_JOB_MESSAGE: &str =
    "The advertising platform is rate-limiting this account. Please wait 30-60 minutes and try again.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_message_gives_an_actionable_wait_window() {
        assert!(RATE_LIMIT_JOB_MESSAGE.contains("30-60 minutes"));
    }
}
