//! Notification Fanout — dispatches one logical alert across email and instant-message
//! channels, collecting per-channel success without failing the whole fanout on a
//! partial delivery failure.

pub mod email;
pub mod formatting;
pub mod messaging;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use email::SmtpConfig;
pub use formatting::{format_currency, format_metric_value, format_percent, format_ratio};
pub use messaging::{MessagingAdapter, MessagingConfig};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("channel not configured: {0}")]
    NotConfigured(String),
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// A single logical alert to deliver, addressed to zero or more destinations per channel.
#[derive(Debug, Clone)]
pub struct AlertPayload {
    pub title: Option<String>,
    pub message: String,
    pub email_to: Option<String>,
    pub im_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub email_delivered: bool,
    pub im_delivered: bool,
}

impl DeliveryReport {
    pub fn any_delivered(&self) -> bool {
        self.email_delivered || self.im_delivered
    }
}

#[async_trait]
pub trait NotificationAdapter: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
    async fn send_message(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct NotificationFanout<A: NotificationAdapter> {
    adapter: A,
}

impl<A: NotificationAdapter> NotificationFanout<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    /// Fans the payload out to every destination it names. Each channel's failure is
    /// logged and folded into the report rather than short-circuiting the others.
    pub async fn dispatch(&self, payload: &AlertPayload) -> DeliveryReport {
        let subject = payload.title.clone().unwrap_or_else(|| "Ad Ops Alert".to_string());

        let email_delivered = match &payload.email_to {
            Some(to) => match self.adapter.send_email(to, &subject, &payload.message).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(channel = "email", error = %e, "notification delivery failed");
                    false
                }
            },
            None => false,
        };

        let im_delivered = match &payload.im_to {
            Some(to) => match self.adapter.send_message(to, &payload.message).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(channel = "im", error = %e, "notification delivery failed");
                    false
                }
            },
            None => false,
        };

        DeliveryReport { email_delivered, im_delivered }
    }
}

/// The production adapter: SMTP for email, the messaging provider for instant messages.
#[derive(Clone)]
pub struct DefaultNotificationAdapter {
    pub smtp: SmtpConfig,
    pub messaging: MessagingAdapter,
}

#[async_trait]
impl NotificationAdapter for DefaultNotificationAdapter {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        email::send_email(&self.smtp, to, subject, body).await
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        self.messaging.send(to, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyAdapter {
        email_calls: Arc<AtomicUsize>,
        fail_im: bool,
    }

    #[async_trait]
    impl NotificationAdapter for FlakyAdapter {
        async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), NotifyError> {
            self.email_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn send_message(&self, _to: &str, _body: &str) -> Result<(), NotifyError> {
            if self.fail_im {
                Err(NotifyError::DeliveryFailed("provider down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn partial_failure_is_not_a_fanout_failure() {
        let fanout = NotificationFanout::new(FlakyAdapter {
            email_calls: Arc::new(AtomicUsize::new(0)),
            fail_im: true,
        });
        let report = fanout
            .dispatch(&AlertPayload {
                title: None,
                message: "CTR dropped below threshold".to_string(),
                email_to: Some("ops@example.com".to_string()),
                im_to: Some("+15550000000".to_string()),
            })
            .await;
        assert!(report.email_delivered);
        assert!(!report.im_delivered);
        assert!(report.any_delivered());
    }

    #[tokio::test]
    async fn missing_destination_is_skipped_not_failed() {
        let fanout = NotificationFanout::new(FlakyAdapter {
            email_calls: Arc::new(AtomicUsize::new(0)),
            fail_im: false,
        });
        let report = fanout
            .dispatch(&AlertPayload {
                title: None,
                message: "m".to_string(),
                email_to: None,
                im_to: None,
            })
            .await;
        assert!(!report.any_delivered());
    }
}
