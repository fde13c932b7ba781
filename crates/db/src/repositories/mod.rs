use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use thiserror::Error;

use concierge_core::domain::booking::{BookingDetails, BookingId, BookingKey};
use concierge_core::domain::room::{CategoryId, RoomCategory};
use concierge_core::domain::service::ServiceMenuItem;
use concierge_core::errors::EngineError;

use crate::mirror::MirrorError;

pub mod booking;
pub mod catalog;
pub mod guest;
pub mod inventory;
pub mod service;

pub use booking::SqlBookingRepository;
pub use catalog::SqlCatalogRepository;
pub use guest::SqlGuestRepository;
pub use inventory::SqlInventoryRepository;
pub use service::SqlServiceRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("billing mirror error: {0}")]
    Mirror(#[from] MirrorError),
}

/// Read access to the immutable reference data: room categories and the
/// service menu.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_room_categories(&self) -> Result<Vec<RoomCategory>, RepositoryError>;
    /// Case-insensitive substring lookup. An exact name wins over a partial
    /// match, otherwise the lowest id wins.
    async fn find_room_category(&self, fragment: &str)
        -> Result<Option<RoomCategory>, RepositoryError>;
    async fn find_room_category_by_id(
        &self,
        id: CategoryId,
    ) -> Result<Option<RoomCategory>, RepositoryError>;
    async fn list_service_menu(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<ServiceMenuItem>, RepositoryError>;
    async fn find_menu_item(&self, name: &str) -> Result<Option<ServiceMenuItem>, RepositoryError>;
}

/// Read side of the booking ledger. Writes go through `BookingLedger`
/// transactions only.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find(&self, key: &BookingKey) -> Result<Option<BookingDetails>, RepositoryError>;
    async fn list_for_guest(&self, email: &str) -> Result<Vec<BookingDetails>, RepositoryError>;
    async fn list_ids(&self) -> Result<Vec<BookingId>, RepositoryError>;
}

impl From<RepositoryError> for EngineError {
    fn from(error: RepositoryError) -> Self {
        EngineError::Store(error.to_string())
    }
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

/// Money is stored as decimal text so no amount passes through a float.
pub(crate) fn parse_money(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}` is not a decimal: {e}")))
}

pub(crate) fn money_text(amount: Decimal) -> String {
    amount.normalize().to_string()
}

pub(crate) fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}` is not a date: {e}")))
}

pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}` is not a timestamp: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{date_text, money_text, parse_date, parse_money, parse_timestamp, RepositoryError};
    use concierge_core::errors::{EngineError, ErrorKind};

    #[test]
    fn money_text_drops_trailing_zeros() {
        assert_eq!(money_text(Decimal::new(75000, 2)), "750");
        assert_eq!(parse_money("price", "750").expect("parse"), Decimal::new(750, 0));
        assert!(matches!(parse_money("price", "seven"), Err(RepositoryError::Decode(_))));
    }

    #[test]
    fn dates_round_trip_through_iso_text() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 22).expect("date");
        assert_eq!(date_text(date), "2026-01-22");
        assert_eq!(parse_date("check_in", "2026-01-22").expect("parse"), date);
    }

    #[test]
    fn unreadable_timestamps_are_decode_errors() {
        let parsed = parse_timestamp("created_at", "2026-01-22T09:30:00+00:00").expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2026-01-22T09:30:00+00:00");
        assert!(matches!(parse_timestamp("created_at", "garbage"), Err(RepositoryError::Decode(_))));
    }

    #[test]
    fn repository_errors_surface_as_store_failures() {
        let error: EngineError = RepositoryError::Decode("bad row".to_string()).into();
        assert_eq!(error.kind(), ErrorKind::StoreFailure);
    }
}
