//! AI Adapter — pluggable campaign-analysis backends selected by the `AI_PROVIDER`
//! setting: `anthropic`, `gemini`, `ollama`, or the dependency-free `rule_based`
//! fallback used when no provider key is configured.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod rule_based;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::reports::MaterializedRow;
use crate::settings::SettingsStore;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider not configured: {0}")]
    NotConfigured(String),
    #[error("AI provider request failed: {0}")]
    RequestFailed(String),
}

#[async_trait]
pub trait AiAdapter: Send + Sync {
    /// Produces a short natural-language analysis of one template's rows.
    async fn analyze_report_rows(&self, template_title: &str, rows: &[MaterializedRow]) -> Result<String, AiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Gemini,
    Ollama,
    RuleBased,
}

impl Provider {
    pub fn parse(s: &str) -> Self {
        match s {
            "anthropic" => Provider::Anthropic,
            "gemini" => Provider::Gemini,
            "ollama" => Provider::Ollama,
            _ => Provider::RuleBased,
        }
    }
}

/// Selects a provider the way the settings bundle does: an explicit `AI_PROVIDER`
/// choice wins; an unset or unrecognized value falls back to `rule_based` so
/// analysis always has a backend with no external dependency.
pub fn select_provider(configured: Option<&str>, has_api_key: bool) -> Provider {
    match configured.map(Provider::parse) {
        Some(Provider::Anthropic) if has_api_key => Provider::Anthropic,
        Some(Provider::Gemini) if has_api_key => Provider::Gemini,
        Some(Provider::Ollama) => Provider::Ollama,
        _ => Provider::RuleBased,
    }
}

/// Builds the concrete adapter named by the Settings Store, falling back to
/// [`rule_based::RuleBasedAdapter`] whenever the configured choice can't run.
pub fn build_adapter(settings: &SettingsStore) -> Arc<dyn AiAdapter> {
    let configured = settings.get("AI_PROVIDER");
    let api_key = settings.get("AI_API_KEY");
    let model = settings.get_or("AI_MODEL", "default");
    let provider = select_provider(configured.as_deref(), api_key.as_deref().is_some_and(|k| !k.is_empty()));

    match provider {
        Provider::Anthropic => Arc::new(anthropic::AnthropicAdapter::new(api_key.unwrap_or_default(), model)),
        Provider::Gemini => Arc::new(gemini::GeminiAdapter::new(api_key.unwrap_or_default(), model)),
        Provider::Ollama => {
            let base_url = settings.get_or("OLLAMA_BASE_URL", "http://localhost:11434");
            Arc::new(ollama::OllamaAdapter::new(base_url, model))
        }
        Provider::RuleBased => Arc::new(rule_based::RuleBasedAdapter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_rule_based_when_unconfigured() {
        assert_eq!(select_provider(None, false), Provider::RuleBased);
    }

    #[test]
    fn falls_back_to_rule_based_when_key_missing_for_cloud_provider() {
        assert_eq!(select_provider(Some("anthropic"), false), Provider::RuleBased);
    }

    #[test]
    fn honors_explicit_cloud_provider_when_key_present() {
        assert_eq!(select_provider(Some("gemini"), true), Provider::Gemini);
    }

    #[test]
    fn ollama_needs_no_api_key() {
        assert_eq!(select_provider(Some("ollama"), false), Provider::Ollama);
    }
}
