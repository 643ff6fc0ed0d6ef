//! Webhook Ingestor — verification handshake and signed callback processing for
//! upstream-pushed change events (§4.6).

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Fields a known "critical" change set covers — any other field is accepted but
/// produces no notification.
const CRITICAL_FIELDS: &[&str] = &["status", "daily_budget", "lifetime_budget"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Campaign,
    AdSet,
    Ad,
    Account,
    Unknown,
}

impl ObjectKind {
    pub fn classify(id: &str) -> Self {
        if id.starts_with("campaign_") {
            ObjectKind::Campaign
        } else if id.starts_with("adset_") {
            ObjectKind::AdSet
        } else if id.starts_with("ad_") {
            ObjectKind::Ad
        } else if id.starts_with("act_") {
            ObjectKind::Account
        } else {
            ObjectKind::Unknown
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub field: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub id: String,
    pub time: i64,
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub object: String,
    pub entry: Vec<WebhookEntry>,
}

/// One critical field transition, ready to be handed to the Notification Fanout.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalChange {
    pub object_kind: ObjectKind,
    pub object_id: String,
    pub field: String,
    pub new_value: String,
}

/// GET verification handshake: returns the challenge iff `mode = subscribe` and the
/// verify token matches the one configured for this deployment.
pub fn verify_challenge(mode: &str, verify_token: &str, challenge: &str, configured_token: &str) -> Option<String> {
    if mode == "subscribe" && !configured_token.is_empty() && verify_token == configured_token {
        Some(challenge.to_string())
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Invalid,
    /// No signing secret configured: verification is skipped in development mode.
    Skipped,
}

/// Verifies the `sha256=<hex>` signature header against the raw request body. Missing
/// secret configuration intentionally skips verification rather than rejecting, matching
/// the development-mode allowance in §4.6.
pub fn verify_signature(signing_secret: Option<&str>, header: Option<&str>, raw_body: &[u8]) -> SignatureCheck {
    let Some(secret) = signing_secret.filter(|s| !s.is_empty()) else {
        return SignatureCheck::Skipped;
    };

    let Some(header) = header.and_then(|h| h.strip_prefix("sha256=")) else {
        return SignatureCheck::Invalid;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return SignatureCheck::Invalid;
    };
    mac.update(raw_body);
    let expected = hex::encode(mac.finalize().into_bytes());

    if constant_time_eq(expected.as_bytes(), header.as_bytes()) {
        SignatureCheck::Valid
    } else {
        SignatureCheck::Invalid
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extracts every critical-field change across the envelope's entries, in order.
pub fn extract_critical_changes(envelope: &WebhookEnvelope) -> Vec<CriticalChange> {
    envelope
        .entry
        .iter()
        .flat_map(|entry| {
            entry.changes.iter().filter_map(move |change| {
                if CRITICAL_FIELDS.contains(&change.field.as_str()) {
                    Some(CriticalChange {
                        object_kind: ObjectKind::classify(&entry.id),
                        object_id: entry.id.clone(),
                        field: change.field.clone(),
                        new_value: change.value.to_string(),
                    })
                } else {
                    None
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_kind_classifies_by_id_prefix() {
        assert_eq!(ObjectKind::classify("campaign_123"), ObjectKind::Campaign);
        assert_eq!(ObjectKind::classify("adset_123"), ObjectKind::AdSet);
        assert_eq!(ObjectKind::classify("ad_123"), ObjectKind::Ad);
        assert_eq!(ObjectKind::classify("act_123"), ObjectKind::Account);
        assert_eq!(ObjectKind::classify("weird_123"), ObjectKind::Unknown);
    }

    #[test]
    fn verify_challenge_requires_subscribe_and_matching_token() {
        assert_eq!(verify_challenge("subscribe", "t1", "abc", "t1"), Some("abc".to_string()));
        assert_eq!(verify_challenge("subscribe", "wrong", "abc", "t1"), None);
        assert_eq!(verify_challenge("unsubscribe", "t1", "abc", "t1"), None);
    }

    #[test]
    fn signature_verification_skips_when_secret_missing() {
        assert_eq!(verify_signature(None, Some("sha256=deadbeef"), b"{}"), SignatureCheck::Skipped);
    }

    #[test]
    fn signature_verification_rejects_missing_header() {
        assert_eq!(verify_signature(Some("secret"), None, b"{}"), SignatureCheck::Invalid);
    }

    #[test]
    fn signature_verification_accepts_correct_hmac() {
        let secret = "secret";
        let body = b"{\"object\":\"page\"}";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));
        assert_eq!(verify_signature(Some(secret), Some(&sig), body), SignatureCheck::Valid);
    }

    #[test]
    fn signature_verification_rejects_wrong_hmac() {
        assert_eq!(
            verify_signature(Some("secret"), Some("sha256=0000"), b"{}"),
            SignatureCheck::Invalid
        );
    }

    #[test]
    fn extracts_only_critical_field_changes() {
        let envelope = WebhookEnvelope {
            object: "page".to_string(),
            entry: vec![WebhookEntry {
                id: "campaign_42".to_string(),
                time: 0,
                changes: vec![
                    WebhookChange { field: "status".to_string(), value: serde_json::json!("PAUSED") },
                    WebhookChange { field: "name".to_string(), value: serde_json::json!("New Name") },
                ],
            }],
        };
        let changes = extract_critical_changes(&envelope);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "status");
        assert_eq!(changes[0].object_kind, ObjectKind::Campaign);
    }
}
