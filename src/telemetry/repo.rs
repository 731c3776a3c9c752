use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::telemetry::dto::ReadingBody;

/// Hard ceiling on range-query results; not client-adjustable.
pub const QUERY_LIMIT: i64 = 100;

/// Stored reading. The id is assigned by the database on insert.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: Uuid,
    pub device_id: String,
    pub temperature: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Handle to the readings table. Constructed once with its pool and
/// injected into the shared state.
#[derive(Clone)]
pub struct TelemetryStore {
    db: PgPool,
}

impl TelemetryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert a batch of readings as one multi-row statement, so the batch
    /// lands atomically: all rows or none.
    pub async fn insert_many(&self, readings: &[ReadingBody]) -> anyhow::Result<u64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO readings (device_id, temperature, timestamp) ");
        builder.push_values(readings, |mut row, reading| {
            row.push_bind(reading.device_id.as_str())
                .push_bind(reading.temperature)
                .push_bind(reading.timestamp);
        });
        let result = builder.build().execute(&self.db).await?;
        Ok(result.rows_affected())
    }

    /// Most recent reading for one device, if any.
    pub async fn latest_for_device(&self, device_id: &str) -> anyhow::Result<Option<Reading>> {
        let reading = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, device_id, temperature, timestamp
            FROM readings
            WHERE device_id = $1
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(reading)
    }

    /// Readings matching the given filters, newest first, capped at
    /// [`QUERY_LIMIT`].
    pub async fn query_range(
        &self,
        device_id: Option<&str>,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> anyhow::Result<Vec<Reading>> {
        let mut builder = range_query(device_id, start, end);
        let rows = builder
            .build_query_as::<Reading>()
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }
}

/// Build the filtered range query. Present filters are ANDed; the result is
/// always ordered descending by timestamp and capped.
fn range_query<'a>(
    device_id: Option<&'a str>,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, device_id, temperature, timestamp FROM readings WHERE TRUE",
    );
    if let Some(device_id) = device_id {
        builder.push(" AND device_id = ").push_bind(device_id);
    }
    if let Some(start) = start {
        builder.push(" AND timestamp >= ").push_bind(start);
    }
    if let Some(end) = end {
        builder.push(" AND timestamp <= ").push_bind(end);
    }
    builder
        .push(" ORDER BY timestamp DESC LIMIT ")
        .push_bind(QUERY_LIMIT);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn unfiltered_query_still_orders_and_caps() {
        let builder = range_query(None, None, None);
        assert_eq!(
            builder.sql(),
            "SELECT id, device_id, temperature, timestamp FROM readings WHERE TRUE \
             ORDER BY timestamp DESC LIMIT $1"
        );
    }

    #[test]
    fn filters_are_appended_in_and_position() {
        let start = datetime!(2024-03-01 00:00 UTC);
        let end = datetime!(2024-03-02 00:00 UTC);
        let builder = range_query(Some("d1"), Some(start), Some(end));
        let sql = builder.sql();
        assert!(sql.contains("AND device_id = $1"));
        assert!(sql.contains("AND timestamp >= $2"));
        assert!(sql.contains("AND timestamp <= $3"));
        assert!(sql.ends_with("ORDER BY timestamp DESC LIMIT $4"));
    }

    #[test]
    fn absent_filters_leave_no_clause_behind() {
        let builder = range_query(Some("d1"), None, None);
        let sql = builder.sql();
        assert!(sql.contains("AND device_id = $1"));
        assert!(!sql.contains(">="));
        assert!(!sql.contains("<="));
        assert!(sql.ends_with("ORDER BY timestamp DESC LIMIT $2"));
    }
}
