//! Domain model for the hotel concierge booking engine.
//!
//! Room categories and units, stay intervals with the overlap rule, bookings
//! and service requests, bill documents, date normalisation, the error
//! taxonomy callers see, and layered configuration. Persistence lives in
//! `concierge-db`; the orchestrator-facing tool boundary in `concierge-agent`.

pub mod billing;
pub mod config;
pub mod dates;
pub mod domain;
pub mod errors;

pub use billing::{BillDocument, BillLine};
pub use dates::parse_stay_date;
pub use domain::booking::{
    AvailabilityQuote, Booking, BookingChanges, BookingConfirmation, BookingDetails, BookingId,
    BookingKey, BookingRequest, CancellationConfirmation, StayInterval,
};
pub use domain::guest::{Guest, GuestContact, GuestId};
pub use domain::room::{CategoryId, RoomCategory, RoomNumber, RoomStatus, RoomUnit};
pub use domain::service::{
    HotlineRequest, MenuItemId, ServiceChargeReceipt, ServiceChargeRequest, ServiceDetail,
    ServiceMenuItem, ServiceRequest, ServiceRequestId, ServiceStatus,
};
pub use errors::{EngineError, ErrorKind, OutcomeToken};

pub use chrono;
pub use rust_decimal;
