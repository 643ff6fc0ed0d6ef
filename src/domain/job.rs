//! Job — durable background-work record. See [`crate::jobs::store`] for persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Export,
    Analyze,
    Archive,
    ScheduledReport,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Export => "export",
            JobKind::Analyze => "analyze",
            JobKind::Archive => "archive",
            JobKind::ScheduledReport => "scheduled_report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub subject_id: String,
    pub status: JobStatus,
    pub progress: i32,
    pub result_text: Option<String>,
    pub output_path: Option<String>,
    pub output_name: Option<String>,
    pub auxiliary_output_path: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Clamps a requested progress value into `[0, 100]` and refuses to move it backwards.
/// Mirrors the original's `update_job_sync`'s `min(100, max(0, progress))` clamp, plus
/// the monotonicity invariant from the design document's §8.
pub fn clamped_progress(current: i32, requested: i32) -> i32 {
    let bounded = requested.clamp(0, 100);
    bounded.max(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_never_decreases() {
        assert_eq!(clamped_progress(50, 30), 50);
    }

    #[test]
    fn progress_clamped_to_valid_range() {
        assert_eq!(clamped_progress(0, 150), 100);
        assert_eq!(clamped_progress(0, -10), 0);
    }

    #[test]
    fn progress_can_advance() {
        assert_eq!(clamped_progress(10, 70), 70);
    }

    #[test]
    fn terminal_status_detection() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }
}
