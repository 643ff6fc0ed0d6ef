//! SavedReportRecipe and the file records it produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SavedReportRecipe {
    pub id: String,
    pub name: String,
    pub template_ids: serde_json::Value,
    pub window_days: i32,
    pub ad_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SavedReportRecipe {
    pub fn template_id_list(&self) -> Vec<String> {
        self.template_ids
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportFileRecord {
    pub id: String,
    pub recipe_id: String,
    pub template_id: String,
    pub file_path: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// Builds a filesystem-safe stem from a user-supplied report name: keep alphanumerics,
/// spaces, `-`, `_`; replace everything else with `_`; truncate to 80 chars.
/// Grounded on the original's `"".join(c if c.isalnum() or c in " -_" else "_" ...)`.
pub fn safe_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_replaces_unsafe_characters() {
        assert_eq!(safe_name("Q3 Report/Final!"), "Q3 Report_Final_");
    }

    #[test]
    fn safe_name_truncates_to_eighty_chars() {
        let long = "a".repeat(200);
        assert_eq!(safe_name(&long).len(), 80);
    }

    #[test]
    fn safe_name_preserves_spaces_dashes_underscores() {
        assert_eq!(safe_name("weekly-report_v2 final"), "weekly-report_v2 final");
    }
}
