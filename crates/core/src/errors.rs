use chrono::NaiveDate;
use thiserror::Error;

/// Coarse error classes surfaced to callers of the booking engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInterval,
    NoAvailability,
    StoreFailure,
}

/// Leading token of an orchestrator-facing status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeToken {
    Success,
    Error,
    Failed,
    Occupied,
    NotFound,
}

impl OutcomeToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Failed => "FAILED",
            Self::Occupied => "OCCUPIED",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("room category matching `{0}` was not found")]
    CategoryNotFound(String),
    #[error("menu item `{0}` was not found")]
    ItemNotFound(String),
    #[error("no booking matches {0}")]
    BookingNotFound(String),
    #[error("room {0} does not exist")]
    RoomNotFound(i64),
    #[error("service request {0} does not exist")]
    ServiceRequestNotFound(i64),
    #[error("could not understand the date `{0}`")]
    UnparseableDate(String),
    #[error("check-in {check_in} must be before check-out {check_out}")]
    InvalidInterval { check_in: NaiveDate, check_out: NaiveDate },
    #[error("no changes were requested")]
    EmptyChangeset,
    #[error("{category} is fully booked from {check_in} to {check_out}")]
    NoAvailability { category: String, check_in: NaiveDate, check_out: NaiveDate },
    #[error("store failure: {0}")]
    Store(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CategoryNotFound(_)
            | Self::ItemNotFound(_)
            | Self::BookingNotFound(_)
            | Self::RoomNotFound(_)
            | Self::ServiceRequestNotFound(_) => ErrorKind::NotFound,
            Self::UnparseableDate(_) | Self::InvalidInterval { .. } | Self::EmptyChangeset => {
                ErrorKind::InvalidInterval
            }
            Self::NoAvailability { .. } => ErrorKind::NoAvailability,
            Self::Store(_) => ErrorKind::StoreFailure,
        }
    }

    pub fn outcome_token(&self) -> OutcomeToken {
        match self.kind() {
            ErrorKind::NotFound => OutcomeToken::NotFound,
            ErrorKind::InvalidInterval => OutcomeToken::Error,
            ErrorKind::NoAvailability => OutcomeToken::Occupied,
            ErrorKind::StoreFailure => OutcomeToken::Failed,
        }
    }

    /// Renders the error in the `TOKEN: details` convention.
    pub fn status_line(&self) -> String {
        format!("{}: {self}", self.outcome_token().as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{EngineError, ErrorKind, OutcomeToken};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).expect("valid date")
    }

    #[test]
    fn lookup_failures_map_to_not_found() {
        for error in [
            EngineError::CategoryNotFound("Penthouse".to_string()),
            EngineError::ItemNotFound("Caviar".to_string()),
            EngineError::BookingNotFound("booking #9".to_string()),
        ] {
            assert_eq!(error.kind(), ErrorKind::NotFound);
            assert_eq!(error.outcome_token(), OutcomeToken::NotFound);
        }
    }

    #[test]
    fn availability_failure_renders_occupied_status() {
        let error = EngineError::NoAvailability {
            category: "Deluxe King".to_string(),
            check_in: date(22),
            check_out: date(24),
        };

        assert_eq!(error.kind(), ErrorKind::NoAvailability);
        assert_eq!(
            error.status_line(),
            "OCCUPIED: Deluxe King is fully booked from 2026-01-22 to 2026-01-24"
        );
    }

    #[test]
    fn store_failure_never_renders_success() {
        let line = EngineError::Store("database is locked".to_string()).status_line();
        assert!(line.starts_with("FAILED: "));
        assert!(line.contains("database is locked"));
    }

    #[test]
    fn date_problems_share_the_invalid_interval_kind() {
        let inverted = EngineError::InvalidInterval { check_in: date(24), check_out: date(22) };
        let garbled = EngineError::UnparseableDate("next blursday".to_string());

        assert_eq!(inverted.kind(), ErrorKind::InvalidInterval);
        assert_eq!(garbled.kind(), ErrorKind::InvalidInterval);
        assert!(inverted.status_line().starts_with("ERROR: "));
    }
}
