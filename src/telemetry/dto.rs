use serde::Deserialize;
use time::OffsetDateTime;

/// Wire form of one reading on ingest. The timestamp is caller-supplied,
/// RFC 3339.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingBody {
    pub device_id: String,
    pub temperature: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Optional range-query filters, ANDed together.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub device_id: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_timestamp: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_timestamp: Option<OffsetDateTime>,
}

impl RangeQuery {
    /// An empty `deviceId` parameter means "no device filter".
    pub fn device_filter(&self) -> Option<&str> {
        self.device_id.as_deref().filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn reading_body_uses_camel_case_and_rfc3339() {
        let body: ReadingBody = serde_json::from_str(
            r#"{"deviceId": "d1", "temperature": 21.5, "timestamp": "2024-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(body.device_id, "d1");
        assert_eq!(body.temperature, 21.5);
        assert_eq!(body.timestamp, datetime!(2024-03-01 12:00 UTC));
    }

    #[test]
    fn range_query_fields_are_all_optional() {
        let query: RangeQuery = serde_json::from_str("{}").unwrap();
        assert!(query.device_id.is_none());
        assert!(query.start_timestamp.is_none());
        assert!(query.end_timestamp.is_none());
    }

    #[test]
    fn empty_device_id_means_no_filter() {
        let query = RangeQuery {
            device_id: Some(String::new()),
            ..RangeQuery::default()
        };
        assert_eq!(query.device_filter(), None);

        let query = RangeQuery {
            device_id: Some("d1".into()),
            ..RangeQuery::default()
        };
        assert_eq!(query.device_filter(), Some("d1"));
    }
}
