//! Google Gemini generateContent API adapter.

use async_trait::async_trait;
use serde_json::json;

use crate::reports::MaterializedRow;

use super::{AiAdapter, AiError};

pub struct GeminiAdapter {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("failed to build AI HTTP client"),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn prompt(template_title: &str, rows: &[MaterializedRow]) -> String {
        let table: Vec<String> = rows
            .iter()
            .take(50)
            .map(|row| row.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", "))
            .collect();
        format!("Summarize this advertising report \"{template_title}\":\n{}", table.join("\n"))
    }
}

#[async_trait]
impl AiAdapter for GeminiAdapter {
    async fn analyze_report_rows(&self, template_title: &str, rows: &[MaterializedRow]) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured("AI_API_KEY is not set".to_string()));
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": Self::prompt(template_title, rows) }] }],
        });

        let resp = self.http.post(url).json(&body).send().await.map_err(|e| AiError::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!("{status}: {text}")));
        }

        let value: serde_json::Value = resp.json().await.map_err(|e| AiError::RequestFailed(e.to_string()))?;
        Ok(value["candidates"][0]["content"]["parts"][0]["text"].as_str().unwrap_or_default().to_string())
    }
}
