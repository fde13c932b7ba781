use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomNumber(pub i64);

impl std::fmt::Display for RoomNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCategory {
    pub id: CategoryId,
    pub name: String,
    pub nightly_rate: Decimal,
}

/// Label stored on a unit. It is only a hint for humans; occupancy is
/// always derived from bookings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Vacant,
    Occupied,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacant => "Vacant",
            Self::Occupied => "Occupied",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("occupied") {
            Self::Occupied
        } else {
            Self::Vacant
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUnit {
    pub number: RoomNumber,
    pub category_id: CategoryId,
    pub status: RoomStatus,
}
