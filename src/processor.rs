use crate::errors::AppError;
use crate::models::{KeywordMapping, NewCapiSignal};
use crate::sender::CapiEventSender;
use crate::store::{KeywordStore, SignalStore};
use crate::webhook_models::{WebhookMessage, WebhookReferral, WebhookValue};
use std::sync::Arc;

/// Processes decoded webhook payloads: records attribution signals for
/// referral-tagged messages and dispatches keyword-matched conversion events.
pub struct WebhookProcessor {
    signal_store: SignalStore,
    keyword_store: KeywordStore,
    sender: Arc<CapiEventSender>,
}

impl WebhookProcessor {
    pub fn new(
        signal_store: SignalStore,
        keyword_store: KeywordStore,
        sender: Arc<CapiEventSender>,
    ) -> Self {
        Self {
            signal_store,
            keyword_store,
            sender,
        }
    }

    pub async fn process_values(&self, values: Vec<&WebhookValue>) {
        for value in values {
            self.process_value(value).await;
        }
    }

    async fn process_value(&self, value: &WebhookValue) {
        let Some(business_phone_number_id) = value
            .metadata
            .as_ref()
            .and_then(|m| m.phone_number_id.as_deref())
        else {
            tracing::warn!("Messages payload without phone_number_id metadata, skipping");
            return;
        };

        let Some(messages) = value.messages.as_deref() else {
            return;
        };

        // A failing message must not abort its siblings.
        for message in messages {
            if let Err(e) = self.process_message(business_phone_number_id, message).await {
                tracing::error!("Failed to process message {}: {}", message.id, e);
            }
        }
    }

    async fn process_message(
        &self,
        business_phone_number_id: &str,
        message: &WebhookMessage,
    ) -> Result<(), AppError> {
        if message.message_type != "text" {
            return Ok(());
        }

        let Some(body) = message.text_body() else {
            tracing::warn!("Text message {} without body, skipping", message.id);
            return Ok(());
        };

        if let Some(referral) = &message.referral {
            let signal = build_referral_signal(business_phone_number_id, message, referral)?;
            self.signal_store.save(signal).await?;
        }

        let mappings = self.keyword_store.find_all().await?;
        let matched = match_keywords(body, &mappings);

        if !matched.is_empty() {
            tracing::debug!(
                "Matched keywords: {}",
                matched
                    .iter()
                    .map(|m| format!("{}:{}", m.id, m.keyword))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        // Dispatches for one message run as independent tasks with isolated
        // error capture; one failure never suppresses the others.
        let mut handles = Vec::with_capacity(matched.len());
        for mapping in matched {
            let sender = Arc::clone(&self.sender);
            let mapping = mapping.clone();
            let business = business_phone_number_id.to_string();
            let consumer = message.from.clone();
            let timestamp = message.timestamp;
            handles.push(tokio::spawn(async move {
                sender
                    .send_business_messaging_event(&business, &consumer, timestamp, &mapping)
                    .await
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(Ok(outcome)) => tracing::debug!("Dispatch outcome: {:?}", outcome),
                Ok(Err(e)) => tracing::error!("Error while sending event to CAPI: {}", e),
                Err(e) => tracing::error!("Dispatch task failed: {}", e),
            }
        }

        Ok(())
    }
}

/// Builds the attribution signal for a referral-tagged message. The referral
/// block is serialized verbatim and the event timestamp is the message's own
/// timestamp, not ingestion time.
fn build_referral_signal(
    business_phone_number_id: &str,
    message: &WebhookMessage,
    referral: &WebhookReferral,
) -> Result<NewCapiSignal, AppError> {
    Ok(NewCapiSignal {
        business_phone_number_id: business_phone_number_id.to_string(),
        consumer_phone_number: message.from.clone(),
        ctwa_clid: referral.ctwa_clid.clone(),
        source_id: referral.source_id.clone(),
        raw_payload: Some(referral.stringify().map_err(|e| {
            AppError::InternalError(format!("Failed to serialize referral: {}", e))
        })?),
        event_timestamp: message.timestamp,
    })
}

/// Returns the mappings whose keyword text is contained in `body`.
///
/// Case-sensitive substring containment with no word-boundary check, so a
/// short keyword can match inside unrelated words. Table enumeration order
/// and duplicates are preserved.
pub fn match_keywords<'a>(body: &str, mappings: &'a [KeywordMapping]) -> Vec<&'a KeywordMapping> {
    mappings
        .iter()
        .filter(|m| body.contains(m.keyword.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook_models::WebhookTextMessage;
    use chrono::{DateTime, Utc};

    fn mapping(id: i32, keyword: &str) -> KeywordMapping {
        KeywordMapping {
            id,
            keyword: keyword.to_string(),
            capi_event: "Purchase".to_string(),
            capi_event_custom_data: None,
            create_date: Utc::now(),
            modify_date: None,
        }
    }

    #[test]
    fn test_matches_substrings_only() {
        let mappings = vec![mapping(1, "order"), mapping(2, "refund"), mapping(3, "buy")];
        let matched = match_keywords("I want to order and buy now", &mappings);
        let ids: Vec<i32> = matched.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let mappings = vec![mapping(1, "Order")];
        assert!(match_keywords("place my order", &mappings).is_empty());
        assert_eq!(match_keywords("place my Order", &mappings).len(), 1);
    }

    #[test]
    fn test_keyword_matches_inside_unrelated_words() {
        let mappings = vec![mapping(1, "art")];
        assert_eq!(match_keywords("restart the flow", &mappings).len(), 1);
    }

    #[test]
    fn test_duplicate_keywords_are_preserved() {
        let mappings = vec![mapping(1, "go"), mapping(2, "go")];
        let matched = match_keywords("go go go", &mappings);
        let ids: Vec<i32> = matched.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_no_match_returns_empty() {
        let mappings = vec![mapping(1, "order")];
        assert!(match_keywords("hello there", &mappings).is_empty());
    }

    #[test]
    fn test_referral_signal_carries_message_timestamp_and_raw_payload() {
        let referral = WebhookReferral {
            ctwa_clid: Some("clid-7".to_string()),
            source_id: Some("ad-3".to_string()),
            source_type: Some("ad".to_string()),
            source_url: None,
            headline: None,
            body: None,
            media_type: None,
            image_url: None,
            video_url: None,
            thumbnail_url: None,
        };
        let message = WebhookMessage {
            from: "15557772222".to_string(),
            id: "wamid.A1".to_string(),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            message_type: "text".to_string(),
            text: Some(WebhookTextMessage {
                body: "hello".to_string(),
            }),
            referral: Some(referral.clone()),
        };

        let signal = build_referral_signal("biz-1", &message, &referral).unwrap();
        assert_eq!(signal.business_phone_number_id, "biz-1");
        assert_eq!(signal.consumer_phone_number, "15557772222");
        assert_eq!(signal.ctwa_clid.as_deref(), Some("clid-7"));
        assert_eq!(signal.source_id.as_deref(), Some("ad-3"));
        assert_eq!(signal.event_timestamp, message.timestamp);
        assert_eq!(
            signal.raw_payload.as_deref(),
            Some(referral.stringify().unwrap().as_str())
        );
    }
}
