use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============ Database Models ============

/// A persisted click-to-WhatsApp attribution signal.
///
/// One row records that a referral-tagged inbound message arrived from a
/// consumer on a business line. Rows are immutable once created; the event
/// timestamp is the message's own timestamp, not ingestion time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CapiSignal {
    pub id: i32,
    pub business_phone_number_id: String,
    pub consumer_phone_number: String,
    pub ctwa_clid: Option<String>,
    pub source_id: Option<String>,
    /// Referral block serialized verbatim at ingestion.
    pub raw_payload: Option<String>,
    pub event_timestamp: DateTime<Utc>,
}

/// Insert form of [`CapiSignal`]; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewCapiSignal {
    pub business_phone_number_id: String,
    pub consumer_phone_number: String,
    pub ctwa_clid: Option<String>,
    pub source_id: Option<String>,
    pub raw_payload: Option<String>,
    pub event_timestamp: DateTime<Utc>,
}

/// A keyword-to-conversion-event mapping.
///
/// Matching is case-sensitive substring containment against the message
/// body, not token or word matching.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct KeywordMapping {
    pub id: i32,
    pub keyword: String,
    pub capi_event: String,
    pub capi_event_custom_data: Option<String>,
    pub create_date: DateTime<Utc>,
    pub modify_date: Option<DateTime<Utc>>,
}

impl KeywordMapping {
    /// Decodes the stored custom-data string, once, at the boundary.
    pub fn custom_data(&self) -> Result<Option<CapiCustomData>, AppError> {
        self.capi_event_custom_data
            .as_deref()
            .map(CapiCustomData::parse)
            .transpose()
    }
}

/// Create/update body for keyword mappings. Client-supplied ids are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordMappingInput {
    pub keyword: String,
    pub capi_event: String,
    #[serde(default)]
    pub capi_event_custom_data: Option<String>,
}

impl KeywordMappingInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.keyword.is_empty() {
            return Err(AppError::BadRequest("keyword cannot be empty".to_string()));
        }
        if self.capi_event.is_empty() {
            return Err(AppError::BadRequest(
                "capi_event cannot be empty".to_string(),
            ));
        }
        if let Some(raw) = self.capi_event_custom_data.as_deref() {
            CapiCustomData::parse(raw)?;
        }
        Ok(())
    }
}

/// Typed custom-data payload attached to a conversion event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapiCustomData {
    pub value: f64,
    pub currency: String,
}

impl CapiCustomData {
    /// Parses a serialized flat object with `value` and `currency` fields.
    /// `value` may arrive as a JSON number or a numeric string.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let parsed: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("Invalid custom data JSON: {}", e)))?;

        let object = parsed
            .as_object()
            .ok_or_else(|| AppError::BadRequest("Custom data must be an object".to_string()))?;

        let value = match object.get("value") {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            AppError::BadRequest("Custom data requires a numeric 'value' field".to_string())
        })?;

        let currency = object
            .get("currency")
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                AppError::BadRequest("Custom data requires a 'currency' field".to_string())
            })?
            .to_string();

        Ok(Self { value, currency })
    }
}

// ============ Response DTOs ============

/// One page of stored signals, with Spring Data style paging metadata.
#[derive(Debug, Serialize)]
pub struct CapiSignalPage {
    #[serde(rename = "capiSignals")]
    pub capi_signals: Vec<CapiSignal>,
    #[serde(rename = "currentPage")]
    pub current_page: i64,
    #[serde(rename = "totalItems")]
    pub total_items: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_data_with_string_value() {
        let data = CapiCustomData::parse(r#"{"value":"12.5","currency":"USD"}"#).unwrap();
        assert_eq!(data.value, 12.5);
        assert_eq!(data.currency, "USD");
    }

    #[test]
    fn test_custom_data_with_numeric_value() {
        let data = CapiCustomData::parse(r#"{"value":99,"currency":"EUR"}"#).unwrap();
        assert_eq!(data.value, 99.0);
        assert_eq!(data.currency, "EUR");
    }

    #[test]
    fn test_custom_data_missing_currency_rejected() {
        assert!(CapiCustomData::parse(r#"{"value":"12.5"}"#).is_err());
    }

    #[test]
    fn test_custom_data_non_numeric_value_rejected() {
        assert!(CapiCustomData::parse(r#"{"value":"lots","currency":"USD"}"#).is_err());
    }

    #[test]
    fn test_custom_data_invalid_json_rejected() {
        assert!(CapiCustomData::parse("not json").is_err());
    }

    #[test]
    fn test_keyword_input_validation() {
        let input = KeywordMappingInput {
            keyword: "order".to_string(),
            capi_event: "Purchase".to_string(),
            capi_event_custom_data: Some(r#"{"value":"5","currency":"USD"}"#.to_string()),
        };
        assert!(input.validate().is_ok());

        let empty_keyword = KeywordMappingInput {
            keyword: String::new(),
            capi_event: "Purchase".to_string(),
            capi_event_custom_data: None,
        };
        assert!(empty_keyword.validate().is_err());

        let bad_custom_data = KeywordMappingInput {
            keyword: "order".to_string(),
            capi_event: "Purchase".to_string(),
            capi_event_custom_data: Some("{".to_string()),
        };
        assert!(bad_custom_data.validate().is_err());
    }
}
