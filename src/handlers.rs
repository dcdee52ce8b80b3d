use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CapiSignalPage, KeywordMapping, KeywordMappingInput};
use crate::sender::CapiEventSender;
use crate::store::{KeywordStore, SignalStore};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Conversion-event dispatcher, built once at startup.
    pub sender: Arc<CapiEventSender>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "wmg-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /keywords
pub async fn list_keywords(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<KeywordMapping>>, AppError> {
    let mappings = KeywordStore::new(state.db.clone()).find_all().await?;
    Ok(Json(mappings))
}

/// POST /keywords
///
/// Creates a mapping; a client-supplied id is ignored, the store assigns one.
pub async fn create_keyword(
    State(state): State<Arc<AppState>>,
    Json(input): Json<KeywordMappingInput>,
) -> Result<Json<KeywordMapping>, AppError> {
    input.validate()?;
    let mapping = KeywordStore::new(state.db.clone()).insert(&input).await?;
    tracing::info!("Created keyword mapping {}: {}", mapping.id, mapping.keyword);
    Ok(Json(mapping))
}

/// GET /keywords/{id}
pub async fn get_keyword(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<KeywordMapping>, AppError> {
    let mapping = KeywordStore::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Keyword mapping {} not found", id)))?;
    Ok(Json(mapping))
}

/// PUT /keywords/{id}
pub async fn update_keyword(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(input): Json<KeywordMappingInput>,
) -> Result<(StatusCode, Json<KeywordMapping>), AppError> {
    input.validate()?;
    let mapping = KeywordStore::new(state.db.clone())
        .update(id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Keyword mapping {} not found", id)))?;
    tracing::info!("Updated keyword mapping {}", id);
    Ok((StatusCode::ACCEPTED, Json(mapping)))
}

/// Query parameters for signal paging.
#[derive(Debug, Deserialize)]
pub struct CapiEventQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
    #[serde(default = "default_sort")]
    pub sort: String,
}

fn default_page_size() -> i64 {
    10
}

fn default_sort() -> String {
    "id,desc".to_string()
}

/// Sortable columns; anything else is rejected rather than interpolated.
fn sort_column(field: &str) -> Option<&'static str> {
    match field {
        "id" => Some("id"),
        "eventTimestamp" | "event_timestamp" => Some("event_timestamp"),
        "businessPhoneNumberId" | "business_phone_number_id" => Some("business_phone_number_id"),
        "consumerPhoneNumber" | "consumer_phone_number" => Some("consumer_phone_number"),
        _ => None,
    }
}

/// GET /capi_events?page=0&size=10&sort=id,desc
///
/// Pages through stored signals; 204 when the requested page is empty.
pub async fn list_capi_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CapiEventQuery>,
) -> Result<Response, AppError> {
    if params.page < 0 || params.size <= 0 {
        return Err(AppError::BadRequest(
            "page must be >= 0 and size must be > 0".to_string(),
        ));
    }

    let parts: Vec<&str> = params.sort.split(',').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(
            "Sort parameter should have a field followed by a direction".to_string(),
        ));
    }

    let column = sort_column(parts[0]).ok_or_else(|| {
        AppError::BadRequest(format!("Cannot sort by field '{}'", parts[0]))
    })?;
    let descending = parts[1].contains("desc");

    let (signals, total_items) = SignalStore::new(state.db.clone())
        .page(params.page, params.size, column, descending)
        .await?;

    if signals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let total_pages = (total_items + params.size - 1) / params.size;
    let page = CapiSignalPage {
        capi_signals: signals,
        current_page: params.page,
        total_items,
        total_pages,
    };

    Ok((StatusCode::OK, Json(page)).into_response())
}
