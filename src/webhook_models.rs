use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound webhook envelope from the WhatsApp Business Platform.
///
/// Only change records whose `field` is `"messages"` carry message traffic;
/// everything else (`statuses`, template updates, ...) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessageWebhook {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    pub value: WebhookValue,
}

/// Field-specific payload of a change record.
///
/// Decoded leniently: change kinds other than `messages` carry different
/// shapes and must never fail envelope decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub metadata: Option<WebhookMetadata>,
    #[serde(default)]
    pub messages: Option<Vec<WebhookMessage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMetadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
}

/// One individual inbound message record.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    pub id: String,
    /// Epoch seconds on the wire, as a string or a number.
    #[serde(deserialize_with = "epoch_seconds::deserialize")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<WebhookTextMessage>,
    #[serde(default)]
    pub referral: Option<WebhookReferral>,
}

impl WebhookMessage {
    pub fn text_body(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.body.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookTextMessage {
    pub body: String,
}

/// Click-to-WhatsApp referral block attached to ad-originated messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookReferral {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctwa_clid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl WebhookReferral {
    /// Serializes the referral block verbatim; absent fields are omitted.
    pub fn stringify(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl IncomingMessageWebhook {
    /// The payloads of all change records tagged `messages`, order-preserving.
    pub fn message_values(&self) -> Vec<&WebhookValue> {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .filter(|c| c.field == "messages")
            .map(|c| &c.value)
            .collect()
    }

    /// True iff at least one messages payload carries a non-empty message list.
    pub fn has_messages(&self) -> bool {
        self.message_values()
            .iter()
            .any(|v| v.messages.as_ref().is_some_and(|m| !m.is_empty()))
    }

    /// Flattened `(business phone number id, message)` pairs, preserving
    /// order per entry and per change record. Payloads without line metadata
    /// contribute nothing.
    pub fn messages(&self) -> Vec<(&str, &WebhookMessage)> {
        self.message_values()
            .into_iter()
            .filter_map(|v| {
                let phone_number_id = v.metadata.as_ref()?.phone_number_id.as_deref()?;
                Some((phone_number_id, v.messages.as_deref().unwrap_or(&[])))
            })
            .flat_map(|(phone_number_id, messages)| {
                messages.iter().map(move |m| (phone_number_id, m))
            })
            .collect()
    }
}

/// Acknowledgement returned to the webhook caller. The contract is
/// "ingested", not "acted on", so this is 200 regardless of matches.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: String,
    #[serde(rename = "messagePayload")]
    pub message_payload: String,
}

impl WebhookAck {
    pub fn received(message_payload: bool) -> Self {
        Self {
            success: "true".to_string(),
            message_payload: message_payload.to_string(),
        }
    }
}

/// Query parameters of the webhook verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerificationParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
}

mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Number(i64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Number(n) => n,
            RawTimestamp::Text(s) => s
                .parse::<i64>()
                .map_err(|_| serde::de::Error::custom("timestamp must be epoch seconds"))?,
        };
        DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}
