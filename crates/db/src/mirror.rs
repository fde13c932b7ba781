//! Billing mirror: one denormalised bill document per booking, regenerated
//! from the ledger whenever a booking's bill changes.
//!
//! The ledger stays the source of truth. A mirror only ever receives bills
//! built from rows visible inside the transaction that produced them.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sqlx::SqliteConnection;
use thiserror::Error;
use tokio::sync::RwLock;

use concierge_core::billing::BillDocument;
use concierge_core::domain::booking::BookingId;

use crate::repositories::{booking, service, RepositoryError};

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("could not write bill artifact `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not remove bill artifact `{path}`: {source}")]
    Remove { path: PathBuf, source: io::Error },
    #[error("could not read bill artifact `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("bill artifact is not valid json: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("billing mirror is unavailable")]
    Unavailable,
}

#[async_trait]
pub trait BillingMirror: Send + Sync {
    /// Replaces the artifact for the bill's booking.
    async fn publish(&self, bill: &BillDocument) -> Result<(), MirrorError>;
    /// Removes the artifact; a missing artifact is not an error.
    async fn discard(&self, booking_id: BookingId) -> Result<(), MirrorError>;
    async fn load(&self, booking_id: BookingId) -> Result<Option<BillDocument>, MirrorError>;
}

/// Writes `bill_booking_<id>.json` files into a directory.
pub struct FileBillingMirror {
    dir: PathBuf,
}

impl FileBillingMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, booking_id: BookingId) -> PathBuf {
        self.dir.join(format!("bill_booking_{}.json", booking_id.0))
    }
}

#[async_trait]
impl BillingMirror for FileBillingMirror {
    async fn publish(&self, bill: &BillDocument) -> Result<(), MirrorError> {
        let path = self.artifact_path(bill.booking_id());
        let staging = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(bill)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| MirrorError::Write { path: self.dir.clone(), source })?;
        tokio::fs::write(&staging, body)
            .await
            .map_err(|source| MirrorError::Write { path: staging.clone(), source })?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|source| MirrorError::Write { path: path.clone(), source })?;

        tracing::debug!(
            event_name = "billing.mirror.written",
            booking_id = bill.booking_id().0,
            path = %path.display(),
            total = %bill.total_grand_bill,
            "bill artifact written"
        );
        Ok(())
    }

    async fn discard(&self, booking_id: BookingId) -> Result<(), MirrorError> {
        let path = self.artifact_path(booking_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MirrorError::Remove { path, source }),
        }
    }

    async fn load(&self, booking_id: BookingId) -> Result<Option<BillDocument>, MirrorError> {
        let path = self.artifact_path(booking_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MirrorError::Read { path, source }),
        }
    }
}

/// Keeps bills in memory. Can be switched to fail every publish.
#[derive(Default)]
pub struct InMemoryBillingMirror {
    bills: RwLock<HashMap<i64, BillDocument>>,
    unavailable: AtomicBool,
}

impl InMemoryBillingMirror {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.bills.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bills.read().await.is_empty()
    }
}

#[async_trait]
impl BillingMirror for InMemoryBillingMirror {
    async fn publish(&self, bill: &BillDocument) -> Result<(), MirrorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable);
        }
        let mut bills = self.bills.write().await;
        bills.insert(bill.booking_id().0, bill.clone());
        Ok(())
    }

    async fn discard(&self, booking_id: BookingId) -> Result<(), MirrorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable);
        }
        let mut bills = self.bills.write().await;
        bills.remove(&booking_id.0);
        Ok(())
    }

    async fn load(&self, booking_id: BookingId) -> Result<Option<BillDocument>, MirrorError> {
        let bills = self.bills.read().await;
        Ok(bills.get(&booking_id.0).cloned())
    }
}

/// Builds the bill for a booking from the rows visible on `conn`.
pub(crate) async fn build_bill_in(
    conn: &mut SqliteConnection,
    booking_id: BookingId,
) -> Result<Option<BillDocument>, RepositoryError> {
    let Some(details) = booking::find_details_in(conn, booking_id).await? else {
        return Ok(None);
    };
    let lines = service::bill_lines_in(conn, booking_id).await?;
    Ok(Some(BillDocument::build(&details, lines)))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{BillingMirror, FileBillingMirror, InMemoryBillingMirror, MirrorError};
    use concierge_core::billing::{BillDocument, BillLine};
    use concierge_core::domain::booking::{Booking, BookingDetails, BookingId, StayInterval};
    use concierge_core::domain::guest::GuestId;
    use concierge_core::domain::room::{CategoryId, RoomNumber};

    fn bill(id: i64, services: &[(&str, i64)]) -> BillDocument {
        let base_cost = Decimal::new(32460, 0);
        let service_cost: Decimal = services.iter().map(|(_, cost)| Decimal::new(*cost, 0)).sum();
        let details = BookingDetails {
            booking: Booking {
                id: BookingId(id),
                guest_id: GuestId(1),
                category_id: CategoryId(1),
                room_number: RoomNumber(101),
                stay: StayInterval::new(
                    NaiveDate::from_ymd_opt(2026, 1, 22).expect("date"),
                    NaiveDate::from_ymd_opt(2026, 1, 24).expect("date"),
                )
                .expect("stay"),
                base_cost,
                service_cost,
                total_bill: base_cost + service_cost,
                created_at: Utc::now(),
            },
            guest_name: "A".to_string(),
            guest_email: "a@x.com".to_string(),
            category_name: "Deluxe King".to_string(),
        };
        let lines = services
            .iter()
            .map(|(item, cost)| BillLine {
                item: (*item).to_string(),
                cost: Decimal::new(*cost, 0),
                date: Utc::now(),
            })
            .collect();
        BillDocument::build(&details, lines)
    }

    #[tokio::test]
    async fn file_mirror_replaces_and_discards_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mirror = FileBillingMirror::new(dir.path().join("bookings_json"));

        mirror.publish(&bill(7, &[])).await.expect("publish");
        mirror.publish(&bill(7, &[("Club Sandwich", 750)])).await.expect("republish");

        let path = mirror.artifact_path(BookingId(7));
        assert!(path.ends_with("bill_booking_7.json"));
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = mirror.load(BookingId(7)).await.expect("load").expect("bill");
        assert_eq!(loaded.total_grand_bill, Decimal::new(33210, 0));
        assert_eq!(loaded.services_bill.items.len(), 1);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        assert!(raw.get("invoice_details").is_some());
        assert!(raw.get("total_grand_bill").is_some());

        mirror.discard(BookingId(7)).await.expect("discard");
        mirror.discard(BookingId(7)).await.expect("discard twice");
        assert!(mirror.load(BookingId(7)).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn unavailable_memory_mirror_rejects_writes() {
        let mirror = InMemoryBillingMirror::default();
        mirror.publish(&bill(1, &[])).await.expect("publish");

        mirror.set_unavailable(true);
        assert!(matches!(mirror.publish(&bill(2, &[])).await, Err(MirrorError::Unavailable)));
        assert!(matches!(mirror.discard(BookingId(1)).await, Err(MirrorError::Unavailable)));

        mirror.set_unavailable(false);
        assert_eq!(mirror.len().await, 1);
        assert!(mirror.load(BookingId(1)).await.expect("load").is_some());
    }
}
