//! Anthropic Messages API adapter.

use async_trait::async_trait;
use serde_json::json;

use crate::reports::MaterializedRow;

use super::{AiAdapter, AiError};

pub struct AnthropicAdapter {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicAdapter {
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
}

fn prompt_for(template_title: &str, rows: &[MaterializedRow]) -> String {
    let table: Vec<String> = rows
        .iter()
        .take(50)
        .map(|row| row.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", "))
        .collect();
    format!(
        "You are an advertising analyst. Summarize key takeaways from this report titled \"{template_title}\":\n{}",
        table.join("\n")
    )
}

#[async_trait]
impl AiAdapter for AnthropicAdapter {
    async fn analyze_report_rows(&self, template_title: &str, rows: &[MaterializedRow]) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured("AI_API_KEY is not set".to_string()));
        }

        let body = json!({
            "model": self.model,
            "max_tokens": 512,
            "messages": [{ "role": "user", "content": prompt_for(template_title, rows) }],
        });

        let resp = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
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
        Ok(value["content"][0]["text"].as_str().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_template_title_and_row_summary() {
        let rows = vec![vec![("Campaign Name".to_string(), "A".to_string())]];
        let prompt = prompt_for("Quality", &rows);
        assert!(prompt.contains("Quality"));
        assert!(prompt.contains("Campaign Name=A"));
    }
}
