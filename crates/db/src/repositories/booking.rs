use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use concierge_core::domain::booking::{Booking, BookingDetails, BookingId, BookingKey, StayInterval};
use concierge_core::domain::guest::{normalize_email, GuestId};
use concierge_core::domain::room::{CategoryId, RoomNumber};

use super::{
    column, date_text, money_text, parse_date, parse_money, parse_timestamp, BookingRepository,
    RepositoryError,
};
use crate::DbPool;

const SELECT_DETAILS: &str = "SELECT b.id, b.guest_id, b.category_id, b.room_number,
        b.check_in, b.check_out, b.base_cost, b.service_cost, b.total_bill, b.created_at,
        g.name AS guest_name, g.email AS guest_email, c.name AS category_name
     FROM booking b
     JOIN guest g ON g.id = b.guest_id
     JOIN room_category c ON c.id = b.category_id";

pub(crate) struct NewBooking {
    pub guest_id: GuestId,
    pub category_id: CategoryId,
    pub room_number: RoomNumber,
    pub stay: StayInterval,
    pub base_cost: Decimal,
}

/// Placement and price of a booking after a modification.
pub(crate) struct Rebooking {
    pub category_id: CategoryId,
    pub room_number: RoomNumber,
    pub stay: StayInterval,
    pub base_cost: Decimal,
    pub total_bill: Decimal,
}

#[derive(Clone)]
pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn find(&self, key: &BookingKey) -> Result<Option<BookingDetails>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        resolve_key_in(&mut conn, key).await
    }

    async fn list_for_guest(&self, email: &str) -> Result<Vec<BookingDetails>, RepositoryError> {
        let sql = format!("{SELECT_DETAILS} WHERE g.email = ?1 ORDER BY b.id");
        let rows = sqlx::query(&sql).bind(normalize_email(email)).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_details).collect()
    }

    async fn list_ids(&self) -> Result<Vec<BookingId>, RepositoryError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM booking ORDER BY id").fetch_all(&self.pool).await?;
        Ok(ids.into_iter().map(BookingId).collect())
    }
}

pub(crate) async fn insert_booking_in(
    conn: &mut SqliteConnection,
    booking: &NewBooking,
    now: DateTime<Utc>,
) -> Result<BookingId, RepositoryError> {
    let timestamp = now.to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO booking (guest_id, category_id, room_number, check_in, check_out,
                              base_cost, service_cost, total_bill, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, '0', ?6, ?7, ?7)",
    )
    .bind(booking.guest_id.0)
    .bind(booking.category_id.0)
    .bind(booking.room_number.0)
    .bind(date_text(booking.stay.check_in()))
    .bind(date_text(booking.stay.check_out()))
    .bind(money_text(booking.base_cost))
    .bind(&timestamp)
    .execute(&mut *conn)
    .await?;

    Ok(BookingId(result.last_insert_rowid()))
}

pub(crate) async fn find_details_in(
    conn: &mut SqliteConnection,
    id: BookingId,
) -> Result<Option<BookingDetails>, RepositoryError> {
    let sql = format!("{SELECT_DETAILS} WHERE b.id = ?1");
    let row = sqlx::query(&sql).bind(id.0).fetch_optional(&mut *conn).await?;

    row.as_ref().map(row_to_details).transpose()
}

/// A guest/category key resolves to that guest's most recent matching booking.
pub(crate) async fn resolve_key_in(
    conn: &mut SqliteConnection,
    key: &BookingKey,
) -> Result<Option<BookingDetails>, RepositoryError> {
    match key {
        BookingKey::Id(id) => find_details_in(conn, *id).await,
        BookingKey::GuestCategory { email, category_fragment } => {
            let fragment = category_fragment.trim();
            if fragment.is_empty() {
                return Ok(None);
            }

            let sql = format!(
                "{SELECT_DETAILS} WHERE g.email = ?1 AND instr(lower(c.name), lower(?2)) > 0
                 ORDER BY b.id DESC LIMIT 1"
            );
            let row = sqlx::query(&sql)
                .bind(normalize_email(email))
                .bind(fragment)
                .fetch_optional(&mut *conn)
                .await?;

            row.as_ref().map(row_to_details).transpose()
        }
    }
}

/// Booking a service charge for `room_number` should land on: the guest's
/// booking of that unit whose stay contains `today`, else the most recent one.
pub(crate) async fn find_charge_owner_in(
    conn: &mut SqliteConnection,
    room_number: RoomNumber,
    email: &str,
    today: NaiveDate,
) -> Result<Option<BookingDetails>, RepositoryError> {
    let sql = format!(
        "{SELECT_DETAILS} WHERE b.room_number = ?1 AND g.email = ?2
         ORDER BY (b.check_in <= ?3 AND ?3 < b.check_out) DESC, b.id DESC
         LIMIT 1"
    );
    let row = sqlx::query(&sql)
        .bind(room_number.0)
        .bind(normalize_email(email))
        .bind(date_text(today))
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(row_to_details).transpose()
}

pub(crate) async fn rebook_in(
    conn: &mut SqliteConnection,
    id: BookingId,
    placement: &Rebooking,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE booking SET category_id = ?1, room_number = ?2, check_in = ?3, check_out = ?4,
                            base_cost = ?5, total_bill = ?6, updated_at = ?7
         WHERE id = ?8",
    )
    .bind(placement.category_id.0)
    .bind(placement.room_number.0)
    .bind(date_text(placement.stay.check_in()))
    .bind(date_text(placement.stay.check_out()))
    .bind(money_text(placement.base_cost))
    .bind(money_text(placement.total_bill))
    .bind(Utc::now().to_rfc3339())
    .bind(id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn set_service_cost_in(
    conn: &mut SqliteConnection,
    id: BookingId,
    service_cost: Decimal,
    total_bill: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE booking SET service_cost = ?1, total_bill = ?2, updated_at = ?3 WHERE id = ?4",
    )
    .bind(money_text(service_cost))
    .bind(money_text(total_bill))
    .bind(Utc::now().to_rfc3339())
    .bind(id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn delete_booking_in(
    conn: &mut SqliteConnection,
    id: BookingId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM booking WHERE id = ?1").bind(id.0).execute(&mut *conn).await?;
    Ok(())
}

fn row_to_details(row: &SqliteRow) -> Result<BookingDetails, RepositoryError> {
    let check_in: String = column(row, "check_in")?;
    let check_out: String = column(row, "check_out")?;
    let base_cost: String = column(row, "base_cost")?;
    let service_cost: String = column(row, "service_cost")?;
    let total_bill: String = column(row, "total_bill")?;
    let created_at: String = column(row, "created_at")?;

    let stay = StayInterval::new(parse_date("check_in", &check_in)?, parse_date("check_out", &check_out)?)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(BookingDetails {
        booking: Booking {
            id: BookingId(column(row, "id")?),
            guest_id: GuestId(column(row, "guest_id")?),
            category_id: CategoryId(column(row, "category_id")?),
            room_number: RoomNumber(column(row, "room_number")?),
            stay,
            base_cost: parse_money("base_cost", &base_cost)?,
            service_cost: parse_money("service_cost", &service_cost)?,
            total_bill: parse_money("total_bill", &total_bill)?,
            created_at: parse_timestamp("created_at", &created_at)?,
        },
        guest_name: column(row, "guest_name")?,
        guest_email: column(row, "guest_email")?,
        category_name: column(row, "category_name")?,
    })
}
