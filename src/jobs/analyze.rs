//! Analyze task (kind=analyze) — §4.2. Fetches each template's rows, asks the AI
//! adapter for a summary, joins results, and renders a PDF. PDF failures are absorbed:
//! the text result still persists and the job still succeeds.

use std::path::Path;

use chrono::Utc;

use crate::ai::AiAdapter;
use crate::domain::report::{safe_name, SavedReportRecipe};
use crate::error::AppResult;
use crate::pdf;
use crate::reports::{materialize, templates};
use crate::upstream::UpstreamClient;

const SEPARATOR: &str = "\n\n---\n\n";

pub struct AnalyzeOutput {
    pub result_text: String,
    pub auxiliary_output_path: Option<String>,
}

pub async fn run(
    job_id: &str,
    recipe: &SavedReportRecipe,
    reports_dir: &Path,
    client: &UpstreamClient,
    ai: &dyn AiAdapter,
    mut on_progress: impl FnMut(i32),
) -> AppResult<AnalyzeOutput> {
    let template_ids = recipe.template_id_list();
    on_progress(0);

    let mut sections = Vec::with_capacity(template_ids.len());
    let total = template_ids.len().max(1);
    for (idx, template_id) in template_ids.iter().enumerate() {
        let title = templates::find(template_id).map(|t| t.title).unwrap_or(template_id);
        let section = match materialize(client, template_id, i64::from(recipe.window_days), recipe.ad_account_id.as_deref()).await {
            Ok(rows) => match ai.analyze_report_rows(title, &rows).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(template_id, error = %e, "AI analysis failed for template, using placeholder");
                    format!("{title}: analysis unavailable ({e})")
                }
            },
            Err(e) => {
                tracing::warn!(template_id, error = %e, "upstream fetch failed for template, using placeholder");
                format!("{title}: data unavailable ({e})")
            }
        };
        sections.push(section);
        on_progress(((idx + 1) * 60 / total) as i32);
    }

    let result_text = sections.join(SEPARATOR);
    on_progress(80);

    let auxiliary_output_path = match pdf::render_text_report(&recipe.name, &result_text) {
        Ok(bytes) => {
            std::fs::create_dir_all(reports_dir).ok();
            let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
            let path = reports_dir.join(format!("{}_{job_id}_{timestamp}.pdf", safe_name(&recipe.name)));
            match std::fs::write(&path, &bytes) {
                Ok(()) => Some(path.to_string_lossy().to_string()),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to write rendered PDF to disk");
                    None
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "PDF rendering failed, persisting text result only");
            None
        }
    };

    on_progress(100);

    Ok(AnalyzeOutput { result_text, auxiliary_output_path })
}
