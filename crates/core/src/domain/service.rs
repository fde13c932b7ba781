use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::BookingId;
use crate::domain::room::RoomNumber;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuItemId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRequestId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMenuItem {
    pub id: MenuItemId,
    pub category: String,
    pub sub_type: String,
    pub item_name: String,
    pub price: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::str::FromStr for ServiceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String =
            value.chars().filter(|ch| ch.is_ascii_alphanumeric()).collect::<String>();
        match normalized.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "inprogress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(format!(
                "unsupported service status `{other}` (expected pending|in_progress|completed|cancelled)"
            )),
        }
    }
}

/// Category-specific record attached to a service request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceDetail {
    Food {
        meal_type: String,
        items: String,
        #[serde(default)]
        special_notes: Option<String>,
    },
    Laundry {
        wash_type: String,
        #[serde(default)]
        cloth_type: Option<String>,
        #[serde(default)]
        return_by: Option<String>,
    },
    Medical {
        emergency_level: String,
        symptom_description: String,
    },
    Bellhop {
        luggage_count: u32,
        action_type: String,
        #[serde(default)]
        destination: Option<String>,
    },
}

impl ServiceDetail {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Food { .. } => "Food",
            Self::Laundry { .. } => "Laundry",
            Self::Medical { .. } => "Medical",
            Self::Bellhop { .. } => "Bellhop",
        }
    }

    /// Detail recorded automatically when a menu item is ordered.
    pub fn for_menu_order(item: &ServiceMenuItem) -> Option<Self> {
        if item.category.eq_ignore_ascii_case("food") {
            Some(Self::Food {
                meal_type: item.sub_type.clone(),
                items: item.item_name.clone(),
                special_notes: None,
            })
        } else if item.category.eq_ignore_ascii_case("laundry") {
            Some(Self::Laundry { wash_type: item.item_name.clone(), cloth_type: None, return_by: None })
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: ServiceRequestId,
    pub room_number: RoomNumber,
    pub guest_email: Option<String>,
    pub booking_id: Option<BookingId>,
    pub category: String,
    pub item_name: Option<String>,
    pub price: Option<Decimal>,
    pub status: ServiceStatus,
    pub created_at: DateTime<Utc>,
    pub detail: Option<ServiceDetail>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceChargeRequest {
    pub room_number: RoomNumber,
    pub email: String,
    pub category: String,
    pub item_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceChargeReceipt {
    pub request_id: ServiceRequestId,
    pub item_name: String,
    pub price: Decimal,
    pub room_number: RoomNumber,
    /// `None` when no booking matched the room and email; the request is
    /// still logged but nothing was billed.
    pub billed_booking: Option<BookingId>,
    pub total_bill: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotlineRequest {
    pub room_number: RoomNumber,
    pub email: Option<String>,
    pub detail: ServiceDetail,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{MenuItemId, ServiceDetail, ServiceMenuItem, ServiceStatus};

    fn item(category: &str, sub_type: &str, name: &str) -> ServiceMenuItem {
        ServiceMenuItem {
            id: MenuItemId(1),
            category: category.to_string(),
            sub_type: sub_type.to_string(),
            item_name: name.to_string(),
            price: Decimal::new(750, 0),
        }
    }

    #[test]
    fn food_orders_record_meal_type_and_item() {
        let detail = ServiceDetail::for_menu_order(&item("Food", "Snacks", "Club Sandwich"));
        assert_eq!(
            detail,
            Some(ServiceDetail::Food {
                meal_type: "Snacks".to_string(),
                items: "Club Sandwich".to_string(),
                special_notes: None,
            })
        );
    }

    #[test]
    fn facility_orders_have_no_detail_record() {
        assert_eq!(ServiceDetail::for_menu_order(&item("Facilities", "Spa", "Spa Package")), None);
    }

    #[test]
    fn status_parsing_accepts_common_spellings() {
        assert_eq!("in_progress".parse::<ServiceStatus>(), Ok(ServiceStatus::InProgress));
        assert_eq!("Canceled".parse::<ServiceStatus>(), Ok(ServiceStatus::Cancelled));
        assert!("lost".parse::<ServiceStatus>().is_err());
    }

    #[test]
    fn detail_json_is_tagged_by_kind() {
        let detail: ServiceDetail = serde_json::from_str(
            r#"{"kind":"bellhop","luggage_count":3,"action_type":"pickup"}"#,
        )
        .expect("parse bellhop detail");

        assert_eq!(detail.category(), "Bellhop");
        assert!(matches!(detail, ServiceDetail::Bellhop { luggage_count: 3, .. }));
    }
}
