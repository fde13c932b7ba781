//! Booking ledger: the only writer of bookings, guests and service charges.
//!
//! Every mutation runs in one transaction that starts by bumping the
//! affected categories' `lock_version`, so the availability read and the
//! write it justifies happen under the same store write lock. The bill for
//! the touched booking is rebuilt from transactional reads and handed to the
//! billing mirror before commit; a failed commit re-synchronises the mirror
//! from committed state.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{error, info, warn};

use concierge_core::dates::parse_stay_date;
use concierge_core::domain::booking::{
    AvailabilityQuote, BookingChanges, BookingConfirmation, BookingDetails, BookingId, BookingKey,
    BookingRequest, CancellationConfirmation, StayInterval,
};
use concierge_core::domain::room::{RoomCategory, RoomStatus};
use concierge_core::errors::EngineError;

use crate::mirror::{build_bill_in, BillingMirror};
use crate::repositories::booking::{self, NewBooking, Rebooking};
use crate::repositories::{
    guest, inventory, BookingRepository, CatalogRepository, RepositoryError, SqlBookingRepository,
    SqlCatalogRepository, SqlInventoryRepository, SqlServiceRequestRepository,
};
use crate::DbPool;

mod services;

pub struct BookingLedger {
    pool: DbPool,
    mirror: Arc<dyn BillingMirror>,
    default_year: i32,
}

impl BookingLedger {
    pub fn new(pool: DbPool, mirror: Arc<dyn BillingMirror>, default_year: i32) -> Self {
        Self { pool, mirror, default_year }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn default_year(&self) -> i32 {
        self.default_year
    }

    pub fn catalog(&self) -> SqlCatalogRepository {
        SqlCatalogRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> SqlInventoryRepository {
        SqlInventoryRepository::new(self.pool.clone())
    }

    pub fn bookings(&self) -> SqlBookingRepository {
        SqlBookingRepository::new(self.pool.clone())
    }

    pub fn service_requests(&self) -> SqlServiceRequestRepository {
        SqlServiceRequestRepository::new(self.pool.clone())
    }

    pub fn parse_stay(&self, check_in: &str, check_out: &str) -> Result<StayInterval, EngineError> {
        let check_in = parse_stay_date(check_in, self.default_year)?;
        let check_out = parse_stay_date(check_out, self.default_year)?;
        StayInterval::new(check_in, check_out)
    }

    pub async fn resolve_category(&self, fragment: &str) -> Result<RoomCategory, EngineError> {
        self.catalog()
            .find_room_category(fragment)
            .await?
            .ok_or_else(|| EngineError::CategoryNotFound(fragment.trim().to_string()))
    }

    /// Read-only: the unit `quote_and_book` would allocate right now.
    pub async fn check_availability(
        &self,
        category: &str,
        check_in: &str,
        check_out: &str,
    ) -> Result<AvailabilityQuote, EngineError> {
        let category = self.resolve_category(category).await?;
        let stay = self.parse_stay(check_in, check_out)?;
        let room_number = self
            .inventory()
            .find_available_unit(category.id, &stay)
            .await?
            .ok_or_else(|| no_availability(&category, &stay))?;

        Ok(AvailabilityQuote {
            category: category.name,
            nightly_rate: category.nightly_rate,
            room_number,
            stay,
        })
    }

    pub async fn get_booking(&self, key: &BookingKey) -> Result<BookingDetails, EngineError> {
        self.bookings()
            .find(key)
            .await?
            .ok_or_else(|| EngineError::BookingNotFound(key.to_string()))
    }

    /// Allocates the first free unit of the category and records the booking
    /// with `total_bill = nightly_rate * nights`.
    pub async fn quote_and_book(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, EngineError> {
        let outcome = self.try_quote_and_book(request).await;
        match &outcome {
            Ok(confirmation) => info!(
                event_name = "ledger.booking.confirmed",
                booking_id = confirmation.booking_id.0,
                room_number = confirmation.room_number.0,
                category = %confirmation.category,
                nights = confirmation.nights,
                total_bill = %confirmation.total_bill,
                "booking confirmed"
            ),
            Err(error) => warn!(
                event_name = "ledger.booking.rejected",
                category = %request.category,
                error_kind = ?error.kind(),
                error = %error,
                "booking rejected"
            ),
        }
        outcome
    }

    async fn try_quote_and_book(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, EngineError> {
        let category = self.resolve_category(&request.category).await?;
        let stay = self.parse_stay(&request.check_in, &request.check_out)?;

        let mut tx = self.begin().await?;
        inventory::lock_categories_in(&mut *tx, &[category.id]).await?;

        let room_number = inventory::find_available_unit_in(&mut *tx, category.id, &stay, None)
            .await?
            .ok_or_else(|| no_availability(&category, &stay))?;
        let base_cost = stay.cost(category.nightly_rate);
        let now = Utc::now();

        let guest_id = guest::upsert_guest_in(&mut *tx, &request.guest, now).await?;
        let booking_id = booking::insert_booking_in(
            &mut *tx,
            &NewBooking { guest_id, category_id: category.id, room_number, stay, base_cost },
            now,
        )
        .await?;
        guest::adjust_total_spent_in(&mut *tx, guest_id, base_cost).await?;
        inventory::set_unit_status_in(&mut *tx, room_number, RoomStatus::Occupied).await?;

        self.publish_bill_in(&mut *tx, booking_id).await?;
        self.commit(tx, booking_id).await?;

        Ok(BookingConfirmation {
            booking_id,
            room_number,
            category: category.name,
            stay,
            nights: stay.nights(),
            base_cost,
            total_bill: base_cost,
        })
    }

    /// Re-prices and, when needed, re-allocates an existing booking. Service
    /// charges already on the bill are kept.
    pub async fn modify_booking(
        &self,
        key: &BookingKey,
        changes: &BookingChanges,
    ) -> Result<BookingConfirmation, EngineError> {
        let outcome = self.try_modify_booking(key, changes).await;
        match &outcome {
            Ok(confirmation) => info!(
                event_name = "ledger.booking.modified",
                booking_id = confirmation.booking_id.0,
                room_number = confirmation.room_number.0,
                category = %confirmation.category,
                stay = %confirmation.stay,
                total_bill = %confirmation.total_bill,
                "booking modified"
            ),
            Err(error) => warn!(
                event_name = "ledger.booking.rejected",
                key = %key,
                error_kind = ?error.kind(),
                error = %error,
                "booking modification rejected"
            ),
        }
        outcome
    }

    async fn try_modify_booking(
        &self,
        key: &BookingKey,
        changes: &BookingChanges,
    ) -> Result<BookingConfirmation, EngineError> {
        if changes.is_empty() {
            return Err(EngineError::EmptyChangeset);
        }

        let current = self.get_booking(key).await?;
        let target = match changes.category.as_deref() {
            Some(fragment) => self.resolve_category(fragment).await?,
            None => self
                .catalog()
                .find_room_category_by_id(current.booking.category_id)
                .await?
                .ok_or_else(|| EngineError::CategoryNotFound(current.category_name.clone()))?,
        };
        let check_in = match changes.check_in.as_deref() {
            Some(raw) => parse_stay_date(raw, self.default_year)?,
            None => current.booking.stay.check_in(),
        };
        let check_out = match changes.check_out.as_deref() {
            Some(raw) => parse_stay_date(raw, self.default_year)?,
            None => current.booking.stay.check_out(),
        };
        let stay = StayInterval::new(check_in, check_out)?;

        let mut tx = self.begin().await?;
        inventory::lock_categories_in(&mut *tx, &[current.booking.category_id, target.id]).await?;

        let current = booking::find_details_in(&mut *tx, current.booking.id)
            .await?
            .ok_or_else(|| EngineError::BookingNotFound(key.to_string()))?;
        let booking_id = current.booking.id;
        let previous_room = current.booking.room_number;

        let keep_unit = target.id == current.booking.category_id
            && inventory::unit_is_free_in(&mut *tx, previous_room, &stay, Some(booking_id)).await?;
        let room_number = if keep_unit {
            previous_room
        } else {
            inventory::find_available_unit_in(&mut *tx, target.id, &stay, Some(booking_id))
                .await?
                .ok_or_else(|| no_availability(&target, &stay))?
        };

        let base_cost = stay.cost(target.nightly_rate);
        let total_bill = base_cost + current.booking.service_cost;
        booking::rebook_in(
            &mut *tx,
            booking_id,
            &Rebooking { category_id: target.id, room_number, stay, base_cost, total_bill },
        )
        .await?;
        guest::adjust_total_spent_in(
            &mut *tx,
            current.booking.guest_id,
            base_cost - current.booking.base_cost,
        )
        .await?;

        if room_number != previous_room {
            inventory::release_unit_if_idle_in(&mut *tx, previous_room).await?;
            inventory::set_unit_status_in(&mut *tx, room_number, RoomStatus::Occupied).await?;
        }

        self.publish_bill_in(&mut *tx, booking_id).await?;
        self.commit(tx, booking_id).await?;

        Ok(BookingConfirmation {
            booking_id,
            room_number,
            category: target.name,
            stay,
            nights: stay.nights(),
            base_cost,
            total_bill,
        })
    }

    /// Deletes the booking, frees its unit and removes its bill artifact.
    pub async fn cancel_booking(
        &self,
        key: &BookingKey,
    ) -> Result<CancellationConfirmation, EngineError> {
        let outcome = self.try_cancel_booking(key).await;
        match &outcome {
            Ok(confirmation) => info!(
                event_name = "ledger.booking.cancelled",
                booking_id = confirmation.booking_id.0,
                room_number = confirmation.room_number.0,
                "booking cancelled"
            ),
            Err(error) => warn!(
                event_name = "ledger.booking.rejected",
                key = %key,
                error_kind = ?error.kind(),
                error = %error,
                "cancellation rejected"
            ),
        }
        outcome
    }

    async fn try_cancel_booking(
        &self,
        key: &BookingKey,
    ) -> Result<CancellationConfirmation, EngineError> {
        let current = self.get_booking(key).await?;

        let mut tx = self.begin().await?;
        inventory::lock_categories_in(&mut *tx, &[current.booking.category_id]).await?;

        let current = booking::find_details_in(&mut *tx, current.booking.id)
            .await?
            .ok_or_else(|| EngineError::BookingNotFound(key.to_string()))?;
        let booking_id = current.booking.id;

        booking::delete_booking_in(&mut *tx, booking_id).await?;
        guest::adjust_total_spent_in(&mut *tx, current.booking.guest_id, -current.booking.total_bill)
            .await?;
        inventory::release_unit_if_idle_in(&mut *tx, current.booking.room_number).await?;

        self.mirror.discard(booking_id).await.map_err(RepositoryError::from)?;
        self.commit(tx, booking_id).await?;

        Ok(CancellationConfirmation {
            booking_id,
            room_number: current.booking.room_number,
            category: current.category_name,
        })
    }

    /// Whether the mirrored bill equals a bill rebuilt from the ledger and its
    /// grand total equals the booking's `total_bill`. A cancelled booking is
    /// consistent only when its artifact is gone.
    pub async fn verify_mirror(&self, booking_id: BookingId) -> Result<bool, EngineError> {
        let (details, expected) = {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            let details = booking::find_details_in(&mut conn, booking_id).await?;
            let expected = build_bill_in(&mut conn, booking_id).await?;
            (details, expected)
        };
        let mirrored = self.mirror.load(booking_id).await.map_err(RepositoryError::from)?;

        Ok(match (details, expected, mirrored) {
            (Some(details), Some(expected), Some(mirrored)) => {
                mirrored == expected && mirrored.matches_ledger(&details)
            }
            (None, None, None) => true,
            _ => false,
        })
    }

    /// Bookings whose bill artifact no longer matches the ledger.
    pub async fn audit_mirrors(&self) -> Result<Vec<BookingId>, EngineError> {
        let mut drifted = Vec::new();
        for booking_id in self.bookings().list_ids().await? {
            if !self.verify_mirror(booking_id).await? {
                drifted.push(booking_id);
            }
        }
        Ok(drifted)
    }

    /// Rewrites or removes the artifact so it reflects committed state.
    pub async fn resync_mirror(&self, booking_id: BookingId) -> Result<(), EngineError> {
        let bill = {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            build_bill_in(&mut conn, booking_id).await?
        };
        let written = match bill {
            Some(bill) => self.mirror.publish(&bill).await,
            None => self.mirror.discard(booking_id).await,
        };
        written.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, EngineError> {
        Ok(self.pool.begin().await.map_err(RepositoryError::from)?)
    }

    async fn publish_bill_in(
        &self,
        conn: &mut SqliteConnection,
        booking_id: BookingId,
    ) -> Result<(), EngineError> {
        let bill = build_bill_in(conn, booking_id).await?.ok_or_else(|| {
            EngineError::Store(format!("booking {booking_id} disappeared before billing"))
        })?;
        self.mirror.publish(&bill).await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn commit(
        &self,
        tx: Transaction<'static, Sqlite>,
        booking_id: BookingId,
    ) -> Result<(), EngineError> {
        if let Err(commit_error) = tx.commit().await {
            if let Err(resync_error) = self.resync_mirror(booking_id).await {
                error!(
                    event_name = "billing.mirror.resync_failed",
                    booking_id = booking_id.0,
                    error = %resync_error,
                    "bill artifact may not match the ledger"
                );
            }
            return Err(RepositoryError::from(commit_error).into());
        }
        Ok(())
    }
}

fn no_availability(category: &RoomCategory, stay: &StayInterval) -> EngineError {
    EngineError::NoAvailability {
        category: category.name.clone(),
        check_in: stay.check_in(),
        check_out: stay.check_out(),
    }
}
