use chrono::Utc;
use tracing::{info, warn};

use concierge_core::domain::guest::normalize_email;
use concierge_core::domain::room::RoomNumber;
use concierge_core::domain::service::{
    HotlineRequest, ServiceChargeReceipt, ServiceChargeRequest, ServiceDetail, ServiceRequest,
    ServiceRequestId, ServiceStatus,
};
use concierge_core::errors::EngineError;

use super::BookingLedger;
use crate::repositories::booking;
use crate::repositories::service::{self, NewServiceRequest};
use crate::repositories::{guest, inventory, CatalogRepository, RepositoryError};

impl BookingLedger {
    /// Records an ordered menu item against a room and bills it to the
    /// guest's booking of that room. Without such a booking the request is
    /// still recorded, unbilled.
    pub async fn log_service_charge(
        &self,
        request: &ServiceChargeRequest,
    ) -> Result<ServiceChargeReceipt, EngineError> {
        let outcome = self.try_log_service_charge(request).await;
        match &outcome {
            Ok(receipt) => match receipt.billed_booking {
                Some(booking_id) => info!(
                    event_name = "ledger.service_charge.logged",
                    request_id = receipt.request_id.0,
                    booking_id = booking_id.0,
                    item = %receipt.item_name,
                    price = %receipt.price,
                    "service charge billed"
                ),
                None => warn!(
                    event_name = "ledger.service_charge.orphaned",
                    request_id = receipt.request_id.0,
                    room_number = receipt.room_number.0,
                    item = %receipt.item_name,
                    "service charge has no booking to bill"
                ),
            },
            Err(error) => warn!(
                event_name = "ledger.service_charge.rejected",
                room_number = request.room_number.0,
                item = %request.item_name,
                error_kind = ?error.kind(),
                error = %error,
                "service charge rejected"
            ),
        }
        outcome
    }

    async fn try_log_service_charge(
        &self,
        request: &ServiceChargeRequest,
    ) -> Result<ServiceChargeReceipt, EngineError> {
        let item = self
            .catalog()
            .find_menu_item(&request.item_name)
            .await?
            .ok_or_else(|| EngineError::ItemNotFound(request.item_name.trim().to_string()))?;
        let unit = self
            .inventory()
            .find_unit(request.room_number)
            .await?
            .ok_or(EngineError::RoomNotFound(request.room_number.0))?;
        if !item.category.eq_ignore_ascii_case(request.category.trim()) {
            tracing::debug!(
                requested = %request.category,
                recorded = %item.category,
                "service category taken from the menu item"
            );
        }

        let email = normalize_email(&request.email);
        let now = Utc::now();

        let mut tx = self.begin().await?;
        inventory::lock_categories_in(&mut *tx, &[unit.category_id]).await?;

        let owner =
            booking::find_charge_owner_in(&mut *tx, unit.number, &email, now.date_naive()).await?;
        let detail = ServiceDetail::for_menu_order(&item);
        let request_id = service::insert_request_in(
            &mut *tx,
            &NewServiceRequest {
                room_number: unit.number,
                guest_email: Some(&email),
                booking_id: owner.as_ref().map(|details| details.booking.id),
                category: &item.category,
                item_name: Some(&item.item_name),
                price: Some(item.price),
                status: ServiceStatus::Completed,
                detail: detail.as_ref(),
            },
            now,
        )
        .await?;

        let Some(owner) = owner else {
            tx.commit().await.map_err(RepositoryError::from)?;
            return Ok(ServiceChargeReceipt {
                request_id,
                item_name: item.item_name,
                price: item.price,
                room_number: unit.number,
                billed_booking: None,
                total_bill: None,
            });
        };

        let booking_id = owner.booking.id;
        let service_cost = owner.booking.service_cost + item.price;
        let total_bill = owner.booking.base_cost + service_cost;
        booking::set_service_cost_in(&mut *tx, booking_id, service_cost, total_bill).await?;
        guest::adjust_total_spent_in(&mut *tx, owner.booking.guest_id, item.price).await?;

        self.publish_bill_in(&mut *tx, booking_id).await?;
        self.commit(tx, booking_id).await?;

        Ok(ServiceChargeReceipt {
            request_id,
            item_name: item.item_name,
            price: item.price,
            room_number: unit.number,
            billed_booking: Some(booking_id),
            total_bill: Some(total_bill),
        })
    }

    /// Opens an unpriced hotline request. It is linked to the guest's booking
    /// of the room when one exists but never changes a bill.
    pub async fn open_service_request(
        &self,
        request: &HotlineRequest,
    ) -> Result<ServiceRequest, EngineError> {
        let unit = self
            .inventory()
            .find_unit(request.room_number)
            .await?
            .ok_or(EngineError::RoomNotFound(request.room_number.0))?;
        let email = request.email.as_deref().map(normalize_email);
        let now = Utc::now();

        let mut tx = self.begin().await?;
        inventory::lock_categories_in(&mut *tx, &[unit.category_id]).await?;
        let owner = match email.as_deref() {
            Some(email) => {
                booking::find_charge_owner_in(&mut *tx, unit.number, email, now.date_naive())
                    .await?
            }
            None => None,
        };
        let request_id = service::insert_request_in(
            &mut *tx,
            &NewServiceRequest {
                room_number: unit.number,
                guest_email: email.as_deref(),
                booking_id: owner.as_ref().map(|details| details.booking.id),
                category: request.detail.category(),
                item_name: None,
                price: None,
                status: ServiceStatus::Pending,
                detail: Some(&request.detail),
            },
            now,
        )
        .await?;
        let opened = service::find_request_in(&mut *tx, request_id)
            .await?
            .ok_or(EngineError::ServiceRequestNotFound(request_id.0))?;
        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            event_name = "ledger.service_request.opened",
            request_id = request_id.0,
            room_number = unit.number.0,
            category = request.detail.category(),
            "service request opened"
        );
        Ok(opened)
    }

    pub async fn update_service_request_status(
        &self,
        id: ServiceRequestId,
        status: ServiceStatus,
    ) -> Result<ServiceRequest, EngineError> {
        let mut tx = self.begin().await?;
        if !service::update_status_in(&mut *tx, id, status).await? {
            return Err(EngineError::ServiceRequestNotFound(id.0));
        }
        let updated = service::find_request_in(&mut *tx, id)
            .await?
            .ok_or(EngineError::ServiceRequestNotFound(id.0))?;
        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            event_name = "ledger.service_request.status_changed",
            request_id = id.0,
            status = status.as_str(),
            "service request status changed"
        );
        Ok(updated)
    }

    pub async fn service_requests_for_room(
        &self,
        room_number: RoomNumber,
    ) -> Result<Vec<ServiceRequest>, EngineError> {
        Ok(self.service_requests().list_for_room(room_number).await?)
    }
}
