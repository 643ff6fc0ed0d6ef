//! Settings Store — operator-facing configuration. Reads merge a JSON file with the
//! process environment; writes persist to the JSON file only. A fixed subset of keys
//! is masked when served through the API.
//!
//! Grounded on the original's `config.py` `get_setting`/`save_settings` pair, generalized
//! from module-level globals into an explicit struct per the dependency-injection note.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::RwLock;
use tokio::fs;

pub const SENSITIVE_KEYS: &[&str] = &[
    "UPSTREAM_ACCESS_TOKEN",
    "UPSTREAM_APP_SECRET",
    "AI_API_KEY",
    "SMTP_PASSWORD",
    "MESSAGING_ACCESS_TOKEN",
    "WEBHOOK_SIGNING_SECRET",
    "OBJECT_STORAGE_ACCESS_KEY",
    "OBJECT_STORAGE_SECRET_KEY",
];

pub const KNOWN_KEYS: &[&str] = &[
    "UPSTREAM_BASE_URL",
    "UPSTREAM_ACCESS_TOKEN",
    "UPSTREAM_AD_ACCOUNT_ID",
    "UPSTREAM_APP_SECRET",
    "AI_PROVIDER",
    "AI_API_KEY",
    "AI_MODEL",
    "OLLAMA_BASE_URL",
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USER",
    "SMTP_PASSWORD",
    "MESSAGING_PHONE_ID",
    "MESSAGING_ACCESS_TOKEN",
    "WEBHOOK_VERIFY_TOKEN",
    "WEBHOOK_SIGNING_SECRET",
    "WEBHOOK_NOTIFY_EMAIL",
    "WEBHOOK_NOTIFY_IM",
    "OBJECT_STORAGE_ENDPOINT",
    "OBJECT_STORAGE_REGION",
    "OBJECT_STORAGE_BUCKET",
    "OBJECT_STORAGE_ACCESS_KEY",
    "OBJECT_STORAGE_SECRET_KEY",
];

/// Masks a sensitive value as `first4****last4`, or `****` when 8 chars or shorter.
pub fn mask(value: &str) -> String {
    if value.len() > 8 {
        let first: String = value.chars().take(4).collect();
        let last: String = value.chars().skip(value.len() - 4).collect();
        format!("{first}****{last}")
    } else {
        "****".to_string()
    }
}

pub struct SettingsStore {
    file_path: PathBuf,
    cache: RwLock<Map<String, Value>>,
}

impl SettingsStore {
    pub async fn load(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let raw = Self::read_raw(&file_path).await;
        Self {
            file_path,
            cache: RwLock::new(raw),
        }
    }

    async fn read_raw(path: &PathBuf) -> Map<String, Value> {
        match fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => Map::new(),
        }
    }

    /// Effective value for `key`: first non-empty of (JSON-file value, env var of the
    /// same name).
    pub fn get(&self, key: &str) -> Option<String> {
        let from_file = {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            cache
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .filter(|v| !v.trim().is_empty())
        };
        from_file.or_else(|| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
        })
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Full settings snapshot for the API, with sensitive keys masked when requested.
    pub fn snapshot(&self, mask_secrets: bool) -> Map<String, Value> {
        let sensitive: HashSet<&str> = SENSITIVE_KEYS.iter().copied().collect();
        let mut out = Map::new();
        for key in KNOWN_KEYS {
            let value = self.get(key).unwrap_or_default();
            if mask_secrets && sensitive.contains(key) && !value.is_empty() {
                out.insert((*key).to_string(), Value::String(mask(&value)));
            } else {
                out.insert((*key).to_string(), Value::String(value));
            }
        }
        out
    }

    /// Persists `updates` to the JSON file. An empty-string value removes the key.
    pub async fn save(&self, updates: Map<String, Value>) -> std::io::Result<()> {
        {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            for (key, value) in updates {
                let is_empty = matches!(&value, Value::String(s) if s.trim().is_empty())
                    || matches!(&value, Value::Null);
                if is_empty {
                    cache.remove(&key);
                } else {
                    cache.insert(key, value);
                }
            }
        }
        self.flush().await
    }

    async fn flush(&self) -> std::io::Result<()> {
        let snapshot = {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            cache.clone()
        };
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let text = serde_json::to_string_pretty(&Value::Object(snapshot))
            .unwrap_or_else(|_| "{}".to_string());
        fs::write(&self.file_path, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_short_value_is_fully_masked() {
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("12345678"), "****");
    }

    #[test]
    fn mask_long_value_keeps_first_and_last_four() {
        assert_eq!(mask("abcdefghijkl"), "abcd****ijkl");
    }
}
