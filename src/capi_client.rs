use crate::errors::AppError;
use crate::models::CapiCustomData;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

pub const ACTION_SOURCE_BUSINESS_MESSAGING: &str = "business_messaging";
pub const MESSAGING_CHANNEL_WHATSAPP: &str = "whatsapp";

/// One conversion event bound for the Conversions API.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionEvent {
    pub event_name: String,
    /// Seconds since epoch, taken from the inbound message timestamp.
    pub event_time: i64,
    pub action_source: &'static str,
    pub messaging_channel: &'static str,
    pub user_data: ConversionUserData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CapiCustomData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionUserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctwa_clid: Option<String>,
    pub page_id: String,
}

impl ConversionEvent {
    pub fn business_messaging(
        event_name: String,
        event_time: i64,
        user_data: ConversionUserData,
        custom_data: Option<CapiCustomData>,
    ) -> Self {
        Self {
            event_name,
            event_time,
            action_source: ACTION_SOURCE_BUSINESS_MESSAGING,
            messaging_channel: MESSAGING_CHANNEL_WHATSAPP,
            user_data,
            custom_data,
        }
    }
}

/// Client for the Conversions API `/{dataset}/events` edge.
///
/// Built once at startup and shared by reference; a bounded timeout keeps a
/// slow endpoint from pinning dispatch tasks.
#[derive(Clone)]
pub struct CapiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl CapiClient {
    pub fn new(base_url: String, access_token: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create CAPI client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            access_token,
        })
    }

    /// Sends a single conversion event, best-effort, one synchronous call.
    pub async fn send_event(
        &self,
        datasource_id: &str,
        event: &ConversionEvent,
    ) -> Result<(), AppError> {
        let url = format!("{}/{}/events", self.base_url, datasource_id);
        let body = json!({ "data": [event] });
        tracing::debug!("CAPI request payload: {}", body);

        let response = self
            .client
            .post(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CAPI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "CAPI returned {}: {}",
                status, error_text
            )));
        }

        let response_body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or_default();
        tracing::info!("CAPI response: {}", response_body);

        Ok(())
    }
}
