use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use concierge_core::domain::booking::{BookingChanges, BookingId, BookingKey, BookingRequest};
use concierge_core::domain::guest::GuestContact;
use concierge_core::errors::EngineError;
use concierge_db::{BookingLedger, CatalogRepository};

use super::{failure, money, parse_args, success, Tool};

pub struct GetAllRoomTypes {
    ledger: Arc<BookingLedger>,
}

impl GetAllRoomTypes {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for GetAllRoomTypes {
    fn name(&self) -> &'static str {
        "get_all_room_types"
    }

    fn description(&self) -> &'static str {
        "Lists every room category with its nightly rate. Use it to suggest alternatives when a room is full."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        let categories = match self.ledger.catalog().list_room_categories().await {
            Ok(categories) => categories,
            Err(error) => return Ok(failure(&EngineError::from(error))),
        };
        let listing = categories
            .iter()
            .map(|category| format!("{} ({}/night)", category.name, money(category.nightly_rate)))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(success(format!("{} room categories: {listing}", categories.len())))
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    room_type: String,
    check_in: String,
    check_out: String,
}

pub struct CheckRoomAvailability {
    ledger: Arc<BookingLedger>,
}

impl CheckRoomAvailability {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for CheckRoomAvailability {
    fn name(&self) -> &'static str {
        "check_room_availability"
    }

    fn description(&self) -> &'static str {
        "Checks whether a room category has a vacant unit for the given dates."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "room_type": { "type": "string" },
                "check_in": { "type": "string", "description": "YYYY-MM-DD" },
                "check_out": { "type": "string", "description": "YYYY-MM-DD" }
            },
            "required": ["room_type", "check_in", "check_out"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let args: AvailabilityArgs = parse_args(self.name(), input)?;
        let line = match self
            .ledger
            .check_availability(&args.room_type, &args.check_in, &args.check_out)
            .await
        {
            Ok(quote) => success(format!(
                "{} is available (Room {}) at {}/night from {}",
                quote.category,
                quote.room_number,
                money(quote.nightly_rate),
                quote.stay
            )),
            Err(error) => failure(&error),
        };
        Ok(line)
    }
}

#[derive(Debug, Deserialize)]
struct FinalizeArgs {
    name: String,
    email: String,
    phone: String,
    #[serde(alias = "room_type")]
    room_name: String,
    check_in: String,
    check_out: String,
}

pub struct FinalizeHotelBooking {
    ledger: Arc<BookingLedger>,
}

impl FinalizeHotelBooking {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for FinalizeHotelBooking {
    fn name(&self) -> &'static str {
        "finalize_hotel_booking"
    }

    fn description(&self) -> &'static str {
        "Saves the booking. Call only once the guest's name, email and phone are known."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string" },
                "phone": { "type": "string" },
                "room_name": { "type": "string" },
                "check_in": { "type": "string" },
                "check_out": { "type": "string" }
            },
            "required": ["name", "email", "phone", "room_name", "check_in", "check_out"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let args: FinalizeArgs = parse_args(self.name(), input)?;
        if args.email.trim().is_empty() {
            bail!("email must not be empty");
        }
        let request = BookingRequest {
            guest: GuestContact::new(args.name.trim(), args.email, args.phone.trim()),
            category: args.room_name,
            check_in: args.check_in,
            check_out: args.check_out,
        };

        let line = match self.ledger.quote_and_book(&request).await {
            Ok(confirmation) => success(format!(
                "Booking {} confirmed. {} room {} from {} ({} nights). Total: {}",
                confirmation.booking_id,
                confirmation.category,
                confirmation.room_number,
                confirmation.stay,
                confirmation.nights,
                money(confirmation.total_bill)
            )),
            Err(error) => failure(&error),
        };
        Ok(line)
    }
}

/// Either `booking_id`, or `email` together with the booked room type.
#[derive(Debug, Deserialize)]
struct KeyArgs {
    #[serde(default)]
    booking_id: Option<i64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    room_type: Option<String>,
}

impl KeyArgs {
    fn into_key(self) -> Result<BookingKey> {
        if let Some(id) = self.booking_id {
            return Ok(BookingKey::Id(BookingId(id)));
        }
        match (self.email, self.room_type) {
            (Some(email), Some(fragment)) if !email.trim().is_empty() && !fragment.trim().is_empty() => {
                Ok(BookingKey::GuestCategory { email, category_fragment: fragment })
            }
            _ => bail!("provide `booking_id` or both `email` and `room_type`"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModifyArgs {
    #[serde(flatten)]
    key: KeyArgs,
    #[serde(default)]
    new_room_type: Option<String>,
    #[serde(default)]
    new_check_in: Option<String>,
    #[serde(default)]
    new_check_out: Option<String>,
}

pub struct ModifyHotelBooking {
    ledger: Arc<BookingLedger>,
}

impl ModifyHotelBooking {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for ModifyHotelBooking {
    fn name(&self) -> &'static str {
        "modify_hotel_booking"
    }

    fn description(&self) -> &'static str {
        "Changes the dates and/or room type of an existing booking. Identify it by booking_id, or by email and the currently booked room_type."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "booking_id": { "type": "integer" },
                "email": { "type": "string" },
                "room_type": { "type": "string", "description": "Currently booked room type" },
                "new_room_type": { "type": "string" },
                "new_check_in": { "type": "string", "description": "YYYY-MM-DD" },
                "new_check_out": { "type": "string", "description": "YYYY-MM-DD" }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let args: ModifyArgs = parse_args(self.name(), input)?;
        let key = args.key.into_key()?;
        let changes = BookingChanges {
            category: args.new_room_type,
            check_in: args.new_check_in,
            check_out: args.new_check_out,
        };

        let line = match self.ledger.modify_booking(&key, &changes).await {
            Ok(confirmation) => success(format!(
                "Booking {} modified. {} room {} from {} ({} nights). Total: {}",
                confirmation.booking_id,
                confirmation.category,
                confirmation.room_number,
                confirmation.stay,
                confirmation.nights,
                money(confirmation.total_bill)
            )),
            Err(error) => failure(&error),
        };
        Ok(line)
    }
}

pub struct CancelHotelBooking {
    ledger: Arc<BookingLedger>,
}

impl CancelHotelBooking {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for CancelHotelBooking {
    fn name(&self) -> &'static str {
        "cancel_hotel_booking"
    }

    fn description(&self) -> &'static str {
        "Cancels a booking and frees its room. Identify it by booking_id, or by email and room_type."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "booking_id": { "type": "integer" },
                "email": { "type": "string" },
                "room_type": { "type": "string" }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let args: KeyArgs = parse_args(self.name(), input)?;
        let key = args.into_key()?;

        let line = match self.ledger.cancel_booking(&key).await {
            Ok(confirmation) => success(format!(
                "Booking {} cancelled. {} room {} is released",
                confirmation.booking_id, confirmation.category, confirmation.room_number
            )),
            Err(error) => failure(&error),
        };
        Ok(line)
    }
}
