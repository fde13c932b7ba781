use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{BookingDetails, BookingId};
use crate::domain::room::RoomNumber;

/// Denormalised bill for one booking, written for external auditing.
/// It is regenerated from the ledger and never read back as truth.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDocument {
    pub invoice_details: InvoiceDetails,
    pub booking_bill: BookingBill,
    pub services_bill: ServicesBill,
    pub total_grand_bill: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub booking_id: BookingId,
    pub guest_name: String,
    pub guest_email: String,
    pub room_number: RoomNumber,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingBill {
    pub room_type: String,
    pub stay_period: String,
    pub nights: u32,
    pub base_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesBill {
    pub items: Vec<BillLine>,
    pub subtotal: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub item: String,
    pub cost: Decimal,
    pub date: DateTime<Utc>,
}

impl BillDocument {
    pub fn build(details: &BookingDetails, items: Vec<BillLine>) -> Self {
        let booking = &details.booking;
        let subtotal = items.iter().map(|line| line.cost).sum::<Decimal>();

        Self {
            invoice_details: InvoiceDetails {
                booking_id: booking.id,
                guest_name: details.guest_name.clone(),
                guest_email: details.guest_email.clone(),
                room_number: booking.room_number,
            },
            booking_bill: BookingBill {
                room_type: details.category_name.clone(),
                stay_period: booking.stay.to_string(),
                nights: booking.stay.nights(),
                base_cost: booking.base_cost,
            },
            services_bill: ServicesBill { items, subtotal },
            total_grand_bill: booking.base_cost + subtotal,
        }
    }

    pub fn booking_id(&self) -> BookingId {
        self.invoice_details.booking_id
    }

    /// Whether the bill agrees with the ledger's running total.
    pub fn matches_ledger(&self, details: &BookingDetails) -> bool {
        self.total_grand_bill == details.booking.total_bill
            && self.booking_bill.base_cost == details.booking.base_cost
            && self.services_bill.subtotal == details.booking.service_cost
    }
}
