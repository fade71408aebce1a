use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

pub mod directory;
pub mod liquidation;
pub mod notification;
pub mod sequence;
pub mod signature;
pub mod travel_order;

pub use directory::SqlDirectoryStore;
pub use liquidation::SqlLiquidationStore;
pub use notification::{SqlNotificationSink, SqlNotificationStore};
pub use signature::SqlSignatureStore;
pub use travel_order::SqlTravelOrderStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("concurrent modification detected for `{0}`")]
    Conflict(String),
}

pub(crate) fn decode_datetime(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("bad timestamp `{raw}`: {error}")))
}

pub(crate) fn decode_date(raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("bad date `{raw}`: {error}")))
}

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
