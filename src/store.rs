use crate::errors::AppError;
use crate::models::{CapiSignal, KeywordMapping, KeywordMappingInput, NewCapiSignal};
use sqlx::PgPool;

/// Durable store of click-to-WhatsApp attribution signals.
#[derive(Clone)]
pub struct SignalStore {
    pool: PgPool,
}

impl SignalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, signal: NewCapiSignal) -> Result<CapiSignal, AppError> {
        let saved = sqlx::query_as::<_, CapiSignal>(
            r#"
            INSERT INTO capi_signals
                (business_phone_number_id, consumer_phone_number, ctwa_clid, source_id, raw_payload, event_timestamp)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&signal.business_phone_number_id)
        .bind(&signal.consumer_phone_number)
        .bind(&signal.ctwa_clid)
        .bind(&signal.source_id)
        .bind(&signal.raw_payload)
        .bind(signal.event_timestamp)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            "Stored attribution signal {} for business {}",
            saved.id,
            saved.business_phone_number_id
        );
        Ok(saved)
    }

    /// Signals for a (business, consumer) pair, newest first.
    pub async fn find_by_business_and_consumer_desc(
        &self,
        business_phone_number_id: &str,
        consumer_phone_number: &str,
    ) -> Result<Vec<CapiSignal>, AppError> {
        let signals = sqlx::query_as::<_, CapiSignal>(
            r#"
            SELECT * FROM capi_signals
            WHERE business_phone_number_id = $1 AND consumer_phone_number = $2
            ORDER BY event_timestamp DESC
            "#,
        )
        .bind(business_phone_number_id)
        .bind(consumer_phone_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(signals)
    }

    /// One page of signals plus the total row count.
    ///
    /// `order_column` must come from the handler's allowlist; it is
    /// interpolated into the statement.
    pub async fn page(
        &self,
        page: i64,
        size: i64,
        order_column: &str,
        descending: bool,
    ) -> Result<(Vec<CapiSignal>, i64), AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM capi_signals")
            .fetch_one(&self.pool)
            .await?;

        let direction = if descending { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT * FROM capi_signals ORDER BY {} {} LIMIT $1 OFFSET $2",
            order_column, direction
        );

        let signals = sqlx::query_as::<_, CapiSignal>(&sql)
            .bind(size)
            .bind(page * size)
            .fetch_all(&self.pool)
            .await?;

        Ok((signals, total))
    }
}

/// Store of keyword-to-conversion-event mappings.
///
/// The table is the source of truth and may change between messages, so the
/// processor reloads it per message instead of caching.
#[derive(Clone)]
pub struct KeywordStore {
    pool: PgPool,
}

impl KeywordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self) -> Result<Vec<KeywordMapping>, AppError> {
        let mappings =
            sqlx::query_as::<_, KeywordMapping>("SELECT * FROM keywords ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(mappings)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<KeywordMapping>, AppError> {
        let mapping = sqlx::query_as::<_, KeywordMapping>("SELECT * FROM keywords WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(mapping)
    }

    pub async fn insert(&self, input: &KeywordMappingInput) -> Result<KeywordMapping, AppError> {
        let mapping = sqlx::query_as::<_, KeywordMapping>(
            r#"
            INSERT INTO keywords (keyword, capi_event, capi_event_custom_data)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&input.keyword)
        .bind(&input.capi_event)
        .bind(&input.capi_event_custom_data)
        .fetch_one(&self.pool)
        .await?;

        Ok(mapping)
    }

    /// Full update; returns `None` when no mapping has the given id.
    pub async fn update(
        &self,
        id: i32,
        input: &KeywordMappingInput,
    ) -> Result<Option<KeywordMapping>, AppError> {
        let mapping = sqlx::query_as::<_, KeywordMapping>(
            r#"
            UPDATE keywords
            SET keyword = $2, capi_event = $3, capi_event_custom_data = $4, modify_date = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.keyword)
        .bind(&input.capi_event)
        .bind(&input.capi_event_custom_data)
        .fetch_optional(&self.pool)
        .await?;

        Ok(mapping)
    }
}
