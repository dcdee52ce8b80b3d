use crate::capi_client::{CapiClient, ConversionEvent, ConversionUserData};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::KeywordMapping;
use crate::store::SignalStore;
use chrono::{DateTime, Duration, Utc};

/// Outcome of one dispatch attempt. Every variant except `Sent` is a
/// designed no-op; remote failure surfaces as an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Dispatch is switched off by configuration.
    Disabled,
    /// No attribution signal exists for the (business, consumer) pair.
    NoSignal,
    /// The most recent signal fell outside the attribution window.
    Stale,
    Sent,
}

/// Attribution gate and dispatcher for business-messaging conversion events.
pub struct CapiEventSender {
    enabled: bool,
    page_id: String,
    datasource_id: String,
    attribution_window_days: i64,
    signal_store: SignalStore,
    client: CapiClient,
}

impl CapiEventSender {
    pub fn new(config: &Config, signal_store: SignalStore, client: CapiClient) -> Self {
        Self {
            enabled: config.capi_enabled,
            page_id: config.capi_page_id.clone(),
            datasource_id: config.capi_datasource_id.clone(),
            attribution_window_days: config.attribution_window_days,
            signal_store,
            client,
        }
    }

    /// Looks up the freshest signal for the pair, applies the attribution
    /// window, and forwards one conversion event for the matched mapping.
    pub async fn send_business_messaging_event(
        &self,
        business_phone_number_id: &str,
        consumer_phone_number: &str,
        message_timestamp: DateTime<Utc>,
        mapping: &KeywordMapping,
    ) -> Result<DispatchOutcome, AppError> {
        if !self.enabled {
            return Ok(DispatchOutcome::Disabled);
        }

        let signals = self
            .signal_store
            .find_by_business_and_consumer_desc(business_phone_number_id, consumer_phone_number)
            .await?;

        let Some(signal) = signals.first() else {
            return Ok(DispatchOutcome::NoSignal);
        };

        let now = Utc::now();
        if !within_attribution_window(signal.event_timestamp, now, self.attribution_window_days) {
            tracing::info!(
                "Signal is older than {} days, not sending to CAPI. Signal timestamp: {}, current timestamp: {}",
                self.attribution_window_days,
                signal.event_timestamp,
                now
            );
            return Ok(DispatchOutcome::Stale);
        }

        let custom_data = mapping.custom_data()?;
        let event = ConversionEvent::business_messaging(
            mapping.capi_event.clone(),
            message_timestamp.timestamp(),
            ConversionUserData {
                ctwa_clid: signal.ctwa_clid.clone(),
                page_id: self.page_id.clone(),
            },
            custom_data,
        );

        tracing::info!("Sending event to CAPI. Event timestamp: {}", message_timestamp);
        self.client.send_event(&self.datasource_id, &event).await?;

        Ok(DispatchOutcome::Sent)
    }
}

/// A signal is attributable while strictly newer than `now - window_days`.
/// Only the lower bound is enforced; future-dated signals pass.
pub fn within_attribution_window(
    event_timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    window_days: i64,
) -> bool {
    event_timestamp > now - Duration::days(window_days)
}
