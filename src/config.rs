use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Token expected in the WMG-Security-Token header on management routes.
    pub security_token: String,
    /// Master switch for outbound CAPI dispatch. Defaults to off.
    pub capi_enabled: bool,
    pub capi_access_token: String,
    pub capi_page_id: String,
    pub capi_datasource_id: String,
    pub capi_base_url: String,
    /// Maximum signal age, in days, for conversion attribution.
    pub attribution_window_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let capi_enabled = std::env::var("CAPI_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .map_err(|_| anyhow::anyhow!("CAPI_ENABLED must be 'true' or 'false'"))?;

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            security_token: std::env::var("WMG_SECURITY_TOKEN")
                .map_err(|_| anyhow::anyhow!("WMG_SECURITY_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("WMG_SECURITY_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            capi_enabled,
            capi_access_token: std::env::var("CAPI_ACCESS_TOKEN").unwrap_or_default(),
            capi_page_id: std::env::var("CAPI_PAGE_ID").unwrap_or_default(),
            capi_datasource_id: std::env::var("CAPI_DATASOURCE_ID").unwrap_or_default(),
            capi_base_url: std::env::var("CAPI_BASE_URL")
                .unwrap_or_else(|_| "https://graph.facebook.com/v21.0".to_string())
                .trim_end_matches('/')
                .to_string(),
            attribution_window_days: std::env::var("CAPI_ATTRIBUTION_WINDOW_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("CAPI_ATTRIBUTION_WINDOW_DAYS must be a valid number of days")
                })?,
        };

        if !config.capi_base_url.starts_with("http://") && !config.capi_base_url.starts_with("https://") {
            anyhow::bail!("CAPI_BASE_URL must start with http:// or https://");
        }

        // Dispatch credentials are only required once the switch is on.
        if config.capi_enabled {
            if config.capi_access_token.trim().is_empty() {
                anyhow::bail!("CAPI_ACCESS_TOKEN required when CAPI_ENABLED=true");
            }
            if config.capi_page_id.trim().is_empty() {
                anyhow::bail!("CAPI_PAGE_ID required when CAPI_ENABLED=true");
            }
            if config.capi_datasource_id.trim().is_empty() {
                anyhow::bail!("CAPI_DATASOURCE_ID required when CAPI_ENABLED=true");
            }
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("CAPI base URL: {}", config.capi_base_url);
        tracing::debug!("CAPI enabled: {}", config.capi_enabled);
        tracing::debug!(
            "Attribution window: {} days",
            config.attribution_window_days
        );
        tracing::debug!("Server port: {}", config.port);

        Ok(config)
    }
}
