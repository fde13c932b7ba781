use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use concierge_core::billing::BillLine;
use concierge_core::domain::booking::BookingId;
use concierge_core::domain::room::RoomNumber;
use concierge_core::domain::service::{ServiceDetail, ServiceRequest, ServiceRequestId, ServiceStatus};

use super::{column, money_text, parse_money, parse_timestamp, RepositoryError};
use crate::DbPool;

const SELECT_REQUEST: &str = "SELECT id, room_number, guest_email, booking_id, category,
        item_name, price, status, created_at
     FROM service_request";

pub(crate) struct NewServiceRequest<'a> {
    pub room_number: RoomNumber,
    pub guest_email: Option<&'a str>,
    pub booking_id: Option<BookingId>,
    pub category: &'a str,
    pub item_name: Option<&'a str>,
    pub price: Option<Decimal>,
    pub status: ServiceStatus,
    pub detail: Option<&'a ServiceDetail>,
}

#[derive(Clone)]
pub struct SqlServiceRequestRepository {
    pool: DbPool,
}

impl SqlServiceRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        id: ServiceRequestId,
    ) -> Result<Option<ServiceRequest>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_request_in(&mut conn, id).await
    }

    pub async fn list_for_room(
        &self,
        room_number: RoomNumber,
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("{SELECT_REQUEST} WHERE room_number = ?1 ORDER BY id");
        let rows = sqlx::query(&sql).bind(room_number.0).fetch_all(&mut *conn).await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut request = row_to_request(row)?;
            request.detail = load_detail_in(&mut conn, request.id, &request.category).await?;
            requests.push(request);
        }
        Ok(requests)
    }
}

pub(crate) async fn insert_request_in(
    conn: &mut SqliteConnection,
    request: &NewServiceRequest<'_>,
    now: DateTime<Utc>,
) -> Result<ServiceRequestId, RepositoryError> {
    let result = sqlx::query(
        "INSERT INTO service_request (room_number, guest_email, booking_id, category,
                                      item_name, price, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(request.room_number.0)
    .bind(request.guest_email)
    .bind(request.booking_id.map(|id| id.0))
    .bind(request.category)
    .bind(request.item_name)
    .bind(request.price.map(money_text))
    .bind(request.status.as_str())
    .bind(now.to_rfc3339())
    .execute(&mut *conn)
    .await?;
    let id = ServiceRequestId(result.last_insert_rowid());

    if let Some(detail) = request.detail {
        insert_detail_in(conn, id, detail).await?;
    }
    Ok(id)
}

async fn insert_detail_in(
    conn: &mut SqliteConnection,
    id: ServiceRequestId,
    detail: &ServiceDetail,
) -> Result<(), RepositoryError> {
    match detail {
        ServiceDetail::Food { meal_type, items, special_notes } => {
            sqlx::query(
                "INSERT INTO service_food (service_request_id, meal_type, items, special_notes)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(id.0)
            .bind(meal_type)
            .bind(items)
            .bind(special_notes)
            .execute(&mut *conn)
            .await?;
        }
        ServiceDetail::Laundry { wash_type, cloth_type, return_by } => {
            sqlx::query(
                "INSERT INTO service_laundry (service_request_id, wash_type, cloth_type, return_by)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(id.0)
            .bind(wash_type)
            .bind(cloth_type)
            .bind(return_by)
            .execute(&mut *conn)
            .await?;
        }
        ServiceDetail::Medical { emergency_level, symptom_description } => {
            sqlx::query(
                "INSERT INTO service_medical (service_request_id, emergency_level, symptom_description)
                 VALUES (?1, ?2, ?3)",
            )
            .bind(id.0)
            .bind(emergency_level)
            .bind(symptom_description)
            .execute(&mut *conn)
            .await?;
        }
        ServiceDetail::Bellhop { luggage_count, action_type, destination } => {
            sqlx::query(
                "INSERT INTO service_bellhop (service_request_id, luggage_count, action_type, destination)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(id.0)
            .bind(i64::from(*luggage_count))
            .bind(action_type)
            .bind(destination)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

pub(crate) async fn find_request_in(
    conn: &mut SqliteConnection,
    id: ServiceRequestId,
) -> Result<Option<ServiceRequest>, RepositoryError> {
    let sql = format!("{SELECT_REQUEST} WHERE id = ?1");
    let row = sqlx::query(&sql).bind(id.0).fetch_optional(&mut *conn).await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut request = row_to_request(&row)?;
    request.detail = load_detail_in(conn, request.id, &request.category).await?;
    Ok(Some(request))
}

pub(crate) async fn update_status_in(
    conn: &mut SqliteConnection,
    id: ServiceRequestId,
    status: ServiceStatus,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE service_request SET status = ?1 WHERE id = ?2")
        .bind(status.as_str())
        .bind(id.0)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Priced requests attached to a booking, oldest first.
pub(crate) async fn bill_lines_in(
    conn: &mut SqliteConnection,
    booking_id: BookingId,
) -> Result<Vec<BillLine>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT item_name, category, price, created_at
         FROM service_request
         WHERE booking_id = ?1 AND price IS NOT NULL
         ORDER BY id",
    )
    .bind(booking_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let item: Option<String> = column(row, "item_name")?;
            let category: String = column(row, "category")?;
            let price: String = column(row, "price")?;
            let created_at: String = column(row, "created_at")?;
            Ok(BillLine {
                item: item.unwrap_or(category),
                cost: parse_money("price", &price)?,
                date: parse_timestamp("created_at", &created_at)?,
            })
        })
        .collect()
}

async fn load_detail_in(
    conn: &mut SqliteConnection,
    id: ServiceRequestId,
    category: &str,
) -> Result<Option<ServiceDetail>, RepositoryError> {
    let detail = match category.to_ascii_lowercase().as_str() {
        "food" => sqlx::query(
            "SELECT meal_type, items, special_notes FROM service_food WHERE service_request_id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?
        .map(|row| -> Result<ServiceDetail, RepositoryError> {
            Ok(ServiceDetail::Food {
                meal_type: column(&row, "meal_type")?,
                items: column(&row, "items")?,
                special_notes: column(&row, "special_notes")?,
            })
        })
        .transpose()?,
        "laundry" => sqlx::query(
            "SELECT wash_type, cloth_type, return_by FROM service_laundry WHERE service_request_id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?
        .map(|row| -> Result<ServiceDetail, RepositoryError> {
            Ok(ServiceDetail::Laundry {
                wash_type: column(&row, "wash_type")?,
                cloth_type: column(&row, "cloth_type")?,
                return_by: column(&row, "return_by")?,
            })
        })
        .transpose()?,
        "medical" => sqlx::query(
            "SELECT emergency_level, symptom_description FROM service_medical
             WHERE service_request_id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?
        .map(|row| -> Result<ServiceDetail, RepositoryError> {
            Ok(ServiceDetail::Medical {
                emergency_level: column(&row, "emergency_level")?,
                symptom_description: column(&row, "symptom_description")?,
            })
        })
        .transpose()?,
        "bellhop" => sqlx::query(
            "SELECT luggage_count, action_type, destination FROM service_bellhop
             WHERE service_request_id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?
        .map(|row| -> Result<ServiceDetail, RepositoryError> {
            let luggage_count: i64 = column(&row, "luggage_count")?;
            Ok(ServiceDetail::Bellhop {
                luggage_count: u32::try_from(luggage_count)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                action_type: column(&row, "action_type")?,
                destination: column(&row, "destination")?,
            })
        })
        .transpose()?,
        _ => None,
    };
    Ok(detail)
}

fn row_to_request(row: &SqliteRow) -> Result<ServiceRequest, RepositoryError> {
    let booking_id: Option<i64> = column(row, "booking_id")?;
    let price: Option<String> = column(row, "price")?;
    let status: String = column(row, "status")?;
    let created_at: String = column(row, "created_at")?;

    Ok(ServiceRequest {
        id: ServiceRequestId(column(row, "id")?),
        room_number: RoomNumber(column(row, "room_number")?),
        guest_email: column(row, "guest_email")?,
        booking_id: booking_id.map(BookingId),
        category: column(row, "category")?,
        item_name: column(row, "item_name")?,
        price: price.as_deref().map(|raw| parse_money("price", raw)).transpose()?,
        status: status.parse::<ServiceStatus>().map_err(RepositoryError::Decode)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        detail: None,
    })
}
