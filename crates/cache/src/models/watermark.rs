use crate::error::Error;
use crate::models::{from_timestamp, to_timestamp};
use time::UtcDateTime;

/// Last successful fetch of one content type, in nanoseconds since the epoch.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct WatermarkRow {
    pub(crate) type_key: String,
    pub(crate) last_fetched_at: i64,
}
impl WatermarkRow {
    pub(crate) fn new(type_key: &str, last_fetched_at: UtcDateTime) -> Result<Self, Error> {
        Ok(Self {
            type_key: type_key.to_string(),
            last_fetched_at: to_timestamp(last_fetched_at, "last fetched at")?,
        })
    }

    pub(crate) fn last_fetched_at(&self) -> Result<UtcDateTime, Error> {
        from_timestamp(self.last_fetched_at, "last fetched at")
    }
}
