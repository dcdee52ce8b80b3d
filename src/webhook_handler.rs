use crate::handlers::AppState;
use crate::processor::WebhookProcessor;
use crate::store::{KeywordStore, SignalStore};
use crate::webhook_models::{IncomingMessageWebhook, VerificationParams, WebhookAck};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

/// WhatsApp webhook ingestion endpoint.
///
/// Decodes the envelope and, when it carries messages, runs the attribution
/// pipeline per message. The response reports ingestion, never dispatch:
/// per-message failures are logged and the caller still gets 200.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<IncomingMessageWebhook>,
) -> (StatusCode, Json<WebhookAck>) {
    tracing::info!(
        "Processing webhook with {} entries",
        webhook.entry.len()
    );

    if !webhook.has_messages() {
        return (StatusCode::OK, Json(WebhookAck::received(false)));
    }

    let processor = WebhookProcessor::new(
        SignalStore::new(state.db.clone()),
        KeywordStore::new(state.db.clone()),
        Arc::clone(&state.sender),
    );
    processor.process_values(webhook.message_values()).await;

    (StatusCode::OK, Json(WebhookAck::received(true)))
}

/// Webhook verification handshake: echo the challenge back verbatim.
/// Signature validation is an upstream concern.
pub async fn verify_webhook(Query(params): Query<VerificationParams>) -> String {
    tracing::info!(
        "Webhook verification: mode={:?}, verify_token={:?}",
        params.mode,
        params.verify_token
    );
    params.challenge.unwrap_or_default()
}
