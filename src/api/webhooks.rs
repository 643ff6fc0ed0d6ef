//! `/api/webhooks/meta` — verification handshake (public GET) and signed callback
//! ingestion (POST, HMAC-gated instead of bearer).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::notify::AlertPayload;
use crate::services::Services;
use crate::webhook::{extract_critical_changes, verify_challenge, verify_signature, SignatureCheck, WebhookEnvelope};

#[derive(Deserialize)]
pub struct VerificationQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

pub async fn verify(State(services): State<Arc<Services>>, Query(query): Query<VerificationQuery>) -> Result<String, StatusCode> {
    let configured_token = services.settings.get("WEBHOOK_VERIFY_TOKEN").unwrap_or_default();
    match verify_challenge(
        query.mode.as_deref().unwrap_or_default(),
        query.verify_token.as_deref().unwrap_or_default(),
        query.challenge.as_deref().unwrap_or_default(),
        &configured_token,
    ) {
        Some(challenge) => Ok(challenge),
        None => Err(StatusCode::FORBIDDEN),
    }
}

#[derive(Serialize)]
pub struct CallbackResponse {
    status: String,
    processed: usize,
}

pub async fn callback(State(services): State<Arc<Services>>, headers: HeaderMap, body: axum::body::Bytes) -> Result<Json<CallbackResponse>, StatusCode> {
    let signing_secret = services.settings.get("WEBHOOK_SIGNING_SECRET");
    let signature_header = headers.get("X-Hub-Signature-256").and_then(|v| v.to_str().ok());

    match verify_signature(signing_secret.as_deref(), signature_header, &body) {
        SignatureCheck::Invalid => return Err(StatusCode::FORBIDDEN),
        SignatureCheck::Valid | SignatureCheck::Skipped => {}
    }
    if signing_secret.as_deref().unwrap_or_default().is_empty() {
        tracing::warn!("webhook signature verification skipped: no signing secret configured");
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        // Always 200 so the upstream doesn't retry a payload we can't make sense of.
        Err(_) => return Ok(Json(CallbackResponse { status: "success".to_string(), processed: 0 })),
    };

    let changes = extract_critical_changes(&envelope);
    let email_to = services.settings.get("WEBHOOK_NOTIFY_EMAIL");
    let im_to = services.settings.get("WEBHOOK_NOTIFY_IM");

    for change in &changes {
        let message = format!(
            "{:?} {} changed {} to {}",
            change.object_kind, change.object_id, change.field, change.new_value
        );
        services
            .fanout
            .dispatch(&AlertPayload {
                title: Some("Upstream change notification".to_string()),
                message,
                email_to: email_to.clone(),
                im_to: im_to.clone(),
            })
            .await;
    }

    Ok(Json(CallbackResponse { status: "success".to_string(), processed: changes.len() }))
}
