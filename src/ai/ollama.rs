//! Local Ollama `/api/generate` adapter — no API key required, only a reachable base URL.

use async_trait::async_trait;
use serde_json::json;

use crate::reports::MaterializedRow;

use super::{AiAdapter, AiError};

pub struct OllamaAdapter {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaAdapter {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("failed to build AI HTTP client"),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl AiAdapter for OllamaAdapter {
    async fn analyze_report_rows(&self, template_title: &str, rows: &[MaterializedRow]) -> Result<String, AiError> {
        if self.base_url.is_empty() {
            return Err(AiError::NotConfigured("OLLAMA_BASE_URL is not set".to_string()));
        }

        let table: Vec<String> = rows
            .iter()
            .take(50)
            .map(|row| row.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", "))
            .collect();
        let prompt = format!("Summarize this advertising report \"{template_title}\":\n{}", table.join("\n"));

        let body = json!({ "model": self.model, "prompt": prompt, "stream": false });
        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!("{status}: {text}")));
        }

        let value: serde_json::Value = resp.json().await.map_err(|e| AiError::RequestFailed(e.to_string()))?;
        Ok(value["response"].as_str().unwrap_or_default().to_string())
    }
}
