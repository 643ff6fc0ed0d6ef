//! Archive task (kind=archive) — §4.2. Recursively uploads every CSV/zip under the
//! reports directory to the configured bucket. Per-file failures are collected but do
//! not fail the job as a whole.

use std::path::Path;

use crate::error::AppResult;
use crate::object_storage::ObjectStorage;

pub struct ArchiveOutput {
    pub uploaded_count: usize,
    pub failed: Vec<(String, String)>,
}

pub async fn run(
    reports_dir: &Path,
    storage: &ObjectStorage,
    mut on_progress: impl FnMut(i32),
) -> AppResult<ArchiveOutput> {
    on_progress(0);

    let files = collect_report_files(reports_dir);
    let total = files.len().max(1);
    let mut uploaded_count = 0;
    let mut failed = Vec::new();

    for (idx, file_path) in files.iter().enumerate() {
        let key = file_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        match std::fs::read(file_path) {
            Ok(bytes) => match storage.put_object(&key, bytes).await {
                Ok(_) => uploaded_count += 1,
                Err(e) => failed.push((key, e.to_string())),
            },
            Err(e) => failed.push((key, e.to_string())),
        }
        on_progress(((idx + 1) * 100 / total) as i32);
    }

    Ok(ArchiveOutput { uploaded_count, failed })
}

fn collect_report_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "csv" || ext == "zip") {
                out.push(path);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_report_files_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), b"x").unwrap();
        std::fs::write(dir.path().join("b.zip"), b"x").unwrap();
        std::fs::write(dir.path().join("c.txt"), b"x").unwrap();
        let files = collect_report_files(dir.path());
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn collect_report_files_descends_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2026-03-01");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("top.csv"), b"x").unwrap();
        std::fs::write(nested.join("nested.csv"), b"x").unwrap();
        let files = collect_report_files(dir.path());
        assert_eq!(files.len(), 2);
    }
}
