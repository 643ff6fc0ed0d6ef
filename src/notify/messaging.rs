//! Instant-messaging delivery adapter — thin reqwest wrapper over a WhatsApp-Business-style
//! send-message endpoint, the same shape the original integration used.

use super::NotifyError;

#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub phone_id: String,
    pub access_token: String,
}

impl MessagingConfig {
    pub fn is_configured(&self) -> bool {
        !self.phone_id.is_empty() && !self.access_token.is_empty()
    }
}

#[derive(Clone)]
pub struct MessagingAdapter {
    http: reqwest::Client,
    config: MessagingConfig,
}

impl MessagingAdapter {
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("failed to build messaging HTTP client"),
            config,
        }
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        if !self.config.is_configured() {
            return Err(NotifyError::NotConfigured("messaging provider credentials are not set".to_string()));
        }

        let url = format!("https://graph.example.com/v1/{}/messages", self.config.phone_id);
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body },
        });

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(NotifyError::DeliveryFailed(format!("{status}: {body}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_adapter_reports_not_configured() {
        let config = MessagingConfig { phone_id: String::new(), access_token: String::new() };
        assert!(!config.is_configured());
    }
}
