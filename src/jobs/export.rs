//! Export task (kind=export) — §4.2.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

use crate::domain::report::{safe_name, SavedReportRecipe};
use crate::error::{AppError, AppResult};
use crate::reports::{materialize, rows_to_csv, templates, MaterializedRow};
use crate::upstream::{UpstreamClient, UpstreamError};

const RATE_LIMIT_RETRY_WAIT: Duration = Duration::from_secs(120);
const RATE_LIMIT_MAX_RETRIES: u32 = 3;
const BETWEEN_TEMPLATE_WAIT: Duration = Duration::from_secs(8);

pub struct ExportOutput {
    pub output_path: String,
    pub output_name: String,
}

async fn fetch_with_retry(
    client: &UpstreamClient,
    template_id: &str,
    window_days: i64,
    account: Option<&str>,
) -> AppResult<Vec<MaterializedRow>> {
    let mut attempts = 0;
    loop {
        match materialize(client, template_id, window_days, account).await {
            Ok(rows) => return Ok(rows),
            Err(UpstreamError::RateLimited(_)) if attempts < RATE_LIMIT_MAX_RETRIES => {
                attempts += 1;
                tracing::warn!(template_id, attempts, "rate limited, backing off before retry");
                sleep(RATE_LIMIT_RETRY_WAIT).await;
            }
            Err(e) => return Err(AppError::from(e)),
        }
    }
}

pub async fn run(
    job_id: &str,
    recipe: &SavedReportRecipe,
    reports_dir: &Path,
    client: &UpstreamClient,
    mut on_progress: impl FnMut(i32),
) -> AppResult<ExportOutput> {
    let template_ids = recipe.template_id_list();
    if template_ids.is_empty() {
        return Err(AppError::Validation("saved report recipe has no templates".to_string()));
    }

    on_progress(0);

    let mut csv_blobs: Vec<(String, Vec<u8>)> = Vec::with_capacity(template_ids.len());
    let total = template_ids.len();
    for (idx, template_id) in template_ids.iter().enumerate() {
        let rows = fetch_with_retry(client, template_id, i64::from(recipe.window_days), recipe.ad_account_id.as_deref()).await?;
        let csv_bytes = rows_to_csv(&rows).map_err(|e| AppError::Internal(e.to_string()))?;
        let title = templates::find(template_id).map(|t| t.title).unwrap_or(template_id);
        csv_blobs.push((safe_name(title), csv_bytes));

        let progress = ((idx + 1) * 80 / total) as i32;
        on_progress(progress);

        if idx + 1 < total {
            sleep(BETWEEN_TEMPLATE_WAIT).await;
        }
    }

    std::fs::create_dir_all(reports_dir).map_err(|e| AppError::Internal(e.to_string()))?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let base_name = safe_name(&recipe.name);

    let (output_path, output_name) = if csv_blobs.len() == 1 {
        let (_, bytes) = &csv_blobs[0];
        let file_name = format!("{base_name}_{job_id}_{timestamp}.csv");
        let download_name = format!("{base_name}_{timestamp}.csv");
        let path = reports_dir.join(&file_name);
        std::fs::write(&path, bytes).map_err(|e| AppError::Internal(e.to_string()))?;
        (path, download_name)
    } else {
        let file_name = format!("{base_name}_{job_id}_{timestamp}.zip");
        let download_name = format!("{base_name}_{timestamp}.zip");
        let path = reports_dir.join(&file_name);
        write_zip(&path, &csv_blobs)?;
        (path, download_name)
    };

    on_progress(100);

    Ok(ExportOutput {
        output_path: output_path.to_string_lossy().to_string(),
        output_name,
    })
}

fn write_zip(path: &Path, entries: &[(String, Vec<u8>)]) -> AppResult<()> {
    let file = std::fs::File::create(path).map_err(|e| AppError::Internal(e.to_string()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, bytes) in entries {
        zip.start_file(format!("{name}.csv"), options).map_err(|e| AppError::Internal(e.to_string()))?;
        zip.write_all(bytes).map_err(|e| AppError::Internal(e.to_string()))?;
    }

    zip.finish().map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_writer_produces_nonempty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        write_zip(&path, &[("a".to_string(), b"col\nval\n".to_vec())]).unwrap();
        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.len() > 0);
    }
}
