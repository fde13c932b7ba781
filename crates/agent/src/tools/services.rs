use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use concierge_core::domain::room::RoomNumber;
use concierge_core::domain::service::{HotlineRequest, ServiceChargeRequest, ServiceDetail};
use concierge_core::errors::{EngineError, OutcomeToken};
use concierge_db::{BookingLedger, CatalogRepository};

use super::{failure, money, parse_args, success, Tool};

#[derive(Debug, Default, Deserialize)]
struct MenuArgs {
    #[serde(default)]
    category: Option<String>,
}

pub struct GetServiceMenu {
    ledger: Arc<BookingLedger>,
}

impl GetServiceMenu {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for GetServiceMenu {
    fn name(&self) -> &'static str {
        "get_service_menu"
    }

    fn description(&self) -> &'static str {
        "Shows the items and prices of a service category (Food, Laundry, Housekeeping, Medical, Bellhop, Facilities). Omit the category for the whole menu."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": { "type": "string" }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let args: MenuArgs = parse_args(self.name(), input)?;
        let category = args.category.as_deref().map(str::trim).filter(|value| !value.is_empty());

        let items = match self.ledger.catalog().list_service_menu(category).await {
            Ok(items) => items,
            Err(error) => return Ok(failure(&EngineError::from(error))),
        };
        if items.is_empty() {
            return Ok(format!(
                "{}: no service menu items in category `{}`",
                OutcomeToken::NotFound.as_str(),
                category.unwrap_or_default()
            ));
        }

        let listing = items
            .iter()
            .map(|item| format!("{} [{} / {}] {}", item.item_name, item.category, item.sub_type, money(item.price)))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(success(format!("{} menu items: {listing}", items.len())))
    }
}

#[derive(Debug, Deserialize)]
struct OrderArgs {
    room_number: i64,
    email: String,
    #[serde(default)]
    category: String,
    item_name: String,
}

pub struct OrderServiceItem {
    ledger: Arc<BookingLedger>,
}

impl OrderServiceItem {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for OrderServiceItem {
    fn name(&self) -> &'static str {
        "order_service_item"
    }

    fn description(&self) -> &'static str {
        "Orders a menu item for a room and adds its price to the guest's bill."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "email": { "type": "string" },
                "room_number": { "type": "integer" },
                "category": { "type": "string" },
                "item_name": { "type": "string" }
            },
            "required": ["email", "room_number", "category", "item_name"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let args: OrderArgs = parse_args(self.name(), input)?;
        if args.item_name.trim().is_empty() {
            bail!("item_name must not be empty");
        }
        let request = ServiceChargeRequest {
            room_number: RoomNumber(args.room_number),
            email: args.email,
            category: args.category,
            item_name: args.item_name,
        };

        let line = match self.ledger.log_service_charge(&request).await {
            Ok(receipt) => match (receipt.billed_booking, receipt.total_bill) {
                (Some(booking_id), Some(total)) => success(format!(
                    "{} ({}) added to Room {} bill for booking {}. Total: {}",
                    receipt.item_name,
                    money(receipt.price),
                    receipt.room_number,
                    booking_id,
                    money(total)
                )),
                _ => success(format!(
                    "{} ({}) logged for Room {}; no booking found to bill",
                    receipt.item_name,
                    money(receipt.price),
                    receipt.room_number
                )),
            },
            Err(error) => failure(&error),
        };
        Ok(line)
    }
}

#[derive(Debug, Deserialize)]
struct HotlineArgs {
    room_number: i64,
    #[serde(default)]
    email: Option<String>,
    detail: ServiceDetail,
}

pub struct OpenServiceRequest {
    ledger: Arc<BookingLedger>,
}

impl OpenServiceRequest {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for OpenServiceRequest {
    fn name(&self) -> &'static str {
        "open_service_request"
    }

    fn description(&self) -> &'static str {
        "Opens an unpriced hotline request (food, laundry, medical or bellhop) for a room."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "room_number": { "type": "integer" },
                "email": { "type": "string" },
                "detail": {
                    "type": "object",
                    "description": "Tagged by `kind`: food {meal_type, items, special_notes?}, laundry {wash_type, cloth_type?, return_by?}, medical {emergency_level, symptom_description}, bellhop {luggage_count, action_type, destination?}",
                    "properties": {
                        "kind": { "type": "string", "enum": ["food", "laundry", "medical", "bellhop"] }
                    },
                    "required": ["kind"]
                }
            },
            "required": ["room_number", "detail"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let args: HotlineArgs = parse_args(self.name(), input)?;
        let request = HotlineRequest {
            room_number: RoomNumber(args.room_number),
            email: args.email.filter(|email| !email.trim().is_empty()),
            detail: args.detail,
        };

        let line = match self.ledger.open_service_request(&request).await {
            Ok(opened) => success(format!(
                "{} request #{} opened for Room {} ({})",
                opened.category,
                opened.id.0,
                opened.room_number,
                opened.status.as_str()
            )),
            Err(error) => failure(&error),
        };
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::test_support::ledger;
    use super::super::ToolRegistry;

    async fn booked_registry() -> ToolRegistry {
        let registry = ToolRegistry::hotel(ledger().await);
        let line = registry
            .dispatch(
                "finalize_hotel_booking",
                json!({
                    "name": "Ada",
                    "email": "ada@example.com",
                    "phone": "555-0101",
                    "room_name": "Deluxe King",
                    "check_in": "2026-01-22",
                    "check_out": "2026-01-24"
                }),
            )
            .await;
        assert!(line.starts_with("SUCCESS: "), "{line}");
        registry
    }

    #[tokio::test]
    async fn menu_lists_a_category_or_reports_not_found() {
        let registry = ToolRegistry::hotel(ledger().await);

        let laundry = registry.dispatch("get_service_menu", json!({ "category": "laundry" })).await;
        assert!(laundry.starts_with("SUCCESS: 6 menu items: "), "{laundry}");
        assert!(laundry.contains("Dry Clean Suit [Laundry / Special] 1500.00"));

        let whole = registry.dispatch("get_service_menu", json!({})).await;
        assert!(whole.contains("Club Sandwich") && whole.contains("Shuttle Service"));

        let missing = registry.dispatch("get_service_menu", json!({ "category": "Casino" })).await;
        assert_eq!(missing, "NOT_FOUND: no service menu items in category `Casino`");
    }

    #[tokio::test]
    async fn ordering_bills_the_booking_of_that_room() {
        let registry = booked_registry().await;

        let line = registry
            .dispatch(
                "order_service_item",
                json!({ "room_number": 101, "email": "ada@example.com", "category": "Food", "item_name": "club sandwich" }),
            )
            .await;

        assert_eq!(
            line,
            "SUCCESS: Club Sandwich (750.00) added to Room 101 bill for booking #1. Total: 33210.00"
        );
    }

    #[tokio::test]
    async fn ordering_without_a_booking_is_logged_unbilled() {
        let registry = ToolRegistry::hotel(ledger().await);

        let line = registry
            .dispatch(
                "order_service_item",
                json!({ "room_number": 205, "email": "walkin@example.com", "category": "Food", "item_name": "French Fries" }),
            )
            .await;
        assert_eq!(line, "SUCCESS: French Fries (600.00) logged for Room 205; no booking found to bill");

        let unknown = registry
            .dispatch(
                "order_service_item",
                json!({ "room_number": 101, "email": "ada@example.com", "category": "Food", "item_name": "Caviar" }),
            )
            .await;
        assert_eq!(unknown, "NOT_FOUND: menu item `Caviar` was not found");
    }

    #[tokio::test]
    async fn hotline_requests_take_tagged_details() {
        let registry = booked_registry().await;

        let line = registry
            .dispatch(
                "open_service_request",
                json!({
                    "room_number": 101,
                    "email": "ada@example.com",
                    "detail": { "kind": "bellhop", "luggage_count": 2, "action_type": "pickup" }
                }),
            )
            .await;
        assert_eq!(line, "SUCCESS: Bellhop request #1 opened for Room 101 (Pending)");

        let untagged = registry
            .dispatch("open_service_request", json!({ "room_number": 101, "detail": { "luggage_count": 2 } }))
            .await;
        assert!(untagged.starts_with("ERROR: invalid arguments for `open_service_request`"), "{untagged}");

        let no_room = registry
            .dispatch(
                "open_service_request",
                json!({ "room_number": 999, "detail": { "kind": "medical", "emergency_level": "high", "symptom_description": "fever" } }),
            )
            .await;
        assert_eq!(no_room, "NOT_FOUND: room 999 does not exist");
    }
}
