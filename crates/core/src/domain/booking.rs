use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::guest::{GuestContact, GuestId};
use crate::domain::room::{CategoryId, RoomNumber};
use crate::errors::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookingId(pub i64);

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Half-open stay `[check_in, check_out)`: the room is free again on the
/// check-out date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StayFields")]
pub struct StayInterval {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Deserialize)]
struct StayFields {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl TryFrom<StayFields> for StayInterval {
    type Error = EngineError;

    fn try_from(fields: StayFields) -> Result<Self, Self::Error> {
        Self::new(fields.check_in, fields.check_out)
    }
}

impl StayInterval {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, EngineError> {
        if check_in >= check_out {
            return Err(EngineError::InvalidInterval { check_in, check_out });
        }
        Ok(Self { check_in, check_out })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Billable nights, never less than one.
    pub fn nights(&self) -> u32 {
        let days = (self.check_out - self.check_in).num_days().max(1);
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    pub fn overlaps(&self, other: &StayInterval) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    pub fn cost(&self, nightly_rate: Decimal) -> Decimal {
        nightly_rate * Decimal::from(self.nights())
    }
}

impl std::fmt::Display for StayInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.check_in, self.check_out)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub guest_id: GuestId,
    pub category_id: CategoryId,
    pub room_number: RoomNumber,
    pub stay: StayInterval,
    pub base_cost: Decimal,
    pub service_cost: Decimal,
    pub total_bill: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_bill_consistent(&self) -> bool {
        self.total_bill == self.base_cost + self.service_cost
    }
}

/// A booking joined with the guest and category it refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub guest_name: String,
    pub guest_email: String,
    pub category_name: String,
}

/// How a caller addresses an existing booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingKey {
    Id(BookingId),
    /// Resolves to the most recent booking of that guest whose category
    /// name contains the fragment. Ambiguous for guests holding several
    /// bookings in one category.
    GuestCategory { email: String, category_fragment: String },
}

impl std::fmt::Display for BookingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "booking {id}"),
            Self::GuestCategory { email, category_fragment } => {
                write!(f, "a `{category_fragment}` booking for {email}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub guest: GuestContact,
    pub category: String,
    pub check_in: String,
    pub check_out: String,
}

/// Partial update of a booking. Every field is independent; dates are raw
/// caller input and are normalised by the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingChanges {
    pub category: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.check_in.is_none() && self.check_out.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub booking_id: BookingId,
    pub room_number: RoomNumber,
    pub category: String,
    pub stay: StayInterval,
    pub nights: u32,
    pub base_cost: Decimal,
    pub total_bill: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationConfirmation {
    pub booking_id: BookingId,
    pub room_number: RoomNumber,
    pub category: String,
}

/// Answer to an availability question: the first free unit of a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuote {
    pub category: String,
    pub nightly_rate: Decimal,
    pub room_number: RoomNumber,
    pub stay: StayInterval,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{BookingChanges, StayInterval};
    use crate::errors::EngineError;

    fn stay(from: u32, to: u32) -> StayInterval {
        StayInterval::new(
            NaiveDate::from_ymd_opt(2026, 1, from).expect("date"),
            NaiveDate::from_ymd_opt(2026, 1, to).expect("date"),
        )
        .expect("valid stay")
    }

    #[test]
    fn deserialized_stays_keep_check_out_after_check_in() {
        let parsed: StayInterval =
            serde_json::from_str(r#"{"check_in":"2026-01-22","check_out":"2026-01-24"}"#).expect("stay");
        assert_eq!(parsed, stay(22, 24));

        let inverted = serde_json::from_str::<StayInterval>(
            r#"{"check_in":"2026-01-24","check_out":"2026-01-22"}"#,
        );
        assert!(inverted.is_err());
        let empty = serde_json::from_str::<StayInterval>(
            r#"{"check_in":"2026-01-22","check_out":"2026-01-22"}"#,
        );
        assert!(empty.is_err());
    }

    #[test]
    fn rejects_inverted_and_empty_intervals() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 22).expect("date");
        let later = NaiveDate::from_ymd_opt(2026, 1, 24).expect("date");

        assert!(matches!(
            StayInterval::new(later, day),
            Err(EngineError::InvalidInterval { .. })
        ));
        assert!(matches!(StayInterval::new(day, day), Err(EngineError::InvalidInterval { .. })));
    }

    #[test]
    fn back_to_back_stays_do_not_overlap() {
        let first = stay(22, 24);
        let second = stay(24, 26);

        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn overlap_is_symmetric_for_partial_and_nested_stays() {
        let outer = stay(10, 20);
        for inner in [stay(12, 14), stay(5, 11), stay(19, 25), stay(10, 20), stay(1, 28)] {
            assert!(outer.overlaps(&inner), "{inner} should overlap {outer}");
            assert!(inner.overlaps(&outer), "{outer} should overlap {inner}");
        }
        assert!(!outer.overlaps(&stay(1, 10)));
        assert!(!outer.overlaps(&stay(20, 21)));
    }

    #[test]
    fn cost_is_rate_times_nights() {
        let two_nights = stay(22, 24);
        assert_eq!(two_nights.nights(), 2);
        assert_eq!(two_nights.cost(Decimal::new(16230, 0)), Decimal::new(32460, 0));
    }

    #[test]
    fn contains_excludes_checkout_day() {
        let two_nights = stay(22, 24);
        assert!(two_nights.contains(NaiveDate::from_ymd_opt(2026, 1, 22).expect("date")));
        assert!(two_nights.contains(NaiveDate::from_ymd_opt(2026, 1, 23).expect("date")));
        assert!(!two_nights.contains(NaiveDate::from_ymd_opt(2026, 1, 24).expect("date")));
    }

    #[test]
    fn default_changeset_is_empty() {
        assert!(BookingChanges::default().is_empty());
        assert!(!BookingChanges { check_out: Some("2026-01-25".to_string()), ..Default::default() }
            .is_empty());
    }
}
