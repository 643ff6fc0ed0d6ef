//! Dependency-free analysis fallback: canned observations driven by fixed thresholds
//! instead of a language model. Used whenever no AI provider is configured.

use async_trait::async_trait;

use crate::reports::MaterializedRow;

use super::{AiAdapter, AiError};

const LOW_CTR_THRESHOLD: f64 = 1.0;
const LOW_ROAS_THRESHOLD: f64 = 2.0;
const HIGH_FREQUENCY_THRESHOLD: f64 = 3.0;

pub struct RuleBasedAdapter;

fn column(row: &MaterializedRow, name: &str) -> Option<f64> {
    row.iter().find(|(k, _)| k == name).and_then(|(_, v)| v.parse().ok())
}

fn row_label(row: &MaterializedRow) -> String {
    row.first().map(|(_, v)| v.clone()).unwrap_or_else(|| "row".to_string())
}

fn observe(row: &MaterializedRow) -> Vec<String> {
    let mut notes = Vec::new();
    if let Some(ctr) = column(row, "CTR") {
        if ctr < LOW_CTR_THRESHOLD {
            notes.push(format!("{} has a low CTR of {ctr:.2}% — consider refreshing creative", row_label(row)));
        }
    }
    if let Some(roas) = column(row, "ROAS") {
        if roas < LOW_ROAS_THRESHOLD {
            notes.push(format!("{} is under-performing on ROAS ({roas:.2}) — review targeting or bid strategy", row_label(row)));
        }
    }
    if let Some(frequency) = column(row, "Frequency") {
        if frequency > HIGH_FREQUENCY_THRESHOLD {
            notes.push(format!("{} shows ad fatigue with frequency {frequency:.2} — widen the audience", row_label(row)));
        }
    }
    notes
}

#[async_trait]
impl AiAdapter for RuleBasedAdapter {
    async fn analyze_report_rows(&self, template_title: &str, rows: &[MaterializedRow]) -> Result<String, AiError> {
        if rows.is_empty() {
            return Ok(format!("{template_title}: no data available for this window."));
        }

        let mut notes: Vec<String> = rows.iter().flat_map(observe).collect();
        if notes.is_empty() {
            notes.push(format!("{template_title}: all rows are within expected thresholds."));
        }

        Ok(format!("{template_title}\n{}", notes.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ctr: &str, roas: &str) -> MaterializedRow {
        vec![
            ("Campaign Name".to_string(), "Spring Sale".to_string()),
            ("CTR".to_string(), ctr.to_string()),
            ("ROAS".to_string(), roas.to_string()),
        ]
    }

    #[tokio::test]
    async fn flags_low_ctr_and_low_roas() {
        let adapter = RuleBasedAdapter;
        let text = adapter.analyze_report_rows("Quality", &[row("0.50", "1.20")]).await.unwrap();
        assert!(text.contains("low CTR"));
        assert!(text.contains("ROAS"));
    }

    #[tokio::test]
    async fn healthy_rows_produce_a_clean_bill() {
        let adapter = RuleBasedAdapter;
        let text = adapter.analyze_report_rows("Quality", &[row("5.00", "4.00")]).await.unwrap();
        assert!(text.contains("within expected thresholds"));
    }

    #[tokio::test]
    async fn empty_rows_report_no_data() {
        let adapter = RuleBasedAdapter;
        let text = adapter.analyze_report_rows("Quality", &[]).await.unwrap();
        assert!(text.contains("no data available"));
    }
}
