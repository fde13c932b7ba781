use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use concierge_core::domain::booking::{BookingId, StayInterval};
use concierge_core::domain::room::{CategoryId, RoomNumber, RoomStatus, RoomUnit};

use super::{column, date_text, RepositoryError};
use crate::DbPool;

/// Sentinel that never matches a booking id; AUTOINCREMENT ids start at 1.
const NO_BOOKING: i64 = 0;

#[derive(Clone)]
pub struct SqlInventoryRepository {
    pool: DbPool,
}

impl SqlInventoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_units(&self, category_id: CategoryId) -> Result<Vec<RoomUnit>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT room_number, category_id, status
             FROM room_unit WHERE category_id = ?1 ORDER BY room_number",
        )
        .bind(category_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_unit).collect()
    }

    pub async fn find_unit(&self, room_number: RoomNumber) -> Result<Option<RoomUnit>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        unit_in(&mut conn, room_number).await
    }

    /// First unit of the category with no booking overlapping `stay`.
    pub async fn find_available_unit(
        &self,
        category_id: CategoryId,
        stay: &StayInterval,
    ) -> Result<Option<RoomNumber>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_available_unit_in(&mut conn, category_id, stay, None).await
    }

    /// Booking holding the unit on `date`, if any.
    pub async fn unit_occupancy(
        &self,
        room_number: RoomNumber,
        date: NaiveDate,
    ) -> Result<Option<BookingId>, RepositoryError> {
        let day = date_text(date);
        let booking_id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM booking
             WHERE room_number = ?1 AND check_in <= ?2 AND ?2 < check_out
             LIMIT 1",
        )
        .bind(room_number.0)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking_id.map(BookingId))
    }
}

pub(crate) async fn find_available_unit_in(
    conn: &mut SqliteConnection,
    category_id: CategoryId,
    stay: &StayInterval,
    ignoring: Option<BookingId>,
) -> Result<Option<RoomNumber>, RepositoryError> {
    let room_number: Option<i64> = sqlx::query_scalar(
        "SELECT u.room_number
         FROM room_unit u
         WHERE u.category_id = ?1
           AND NOT EXISTS (
               SELECT 1 FROM booking b
               WHERE b.room_number = u.room_number
                 AND b.check_in < ?3
                 AND ?2 < b.check_out
                 AND b.id <> ?4
           )
         ORDER BY u.room_number ASC
         LIMIT 1",
    )
    .bind(category_id.0)
    .bind(date_text(stay.check_in()))
    .bind(date_text(stay.check_out()))
    .bind(ignoring.map_or(NO_BOOKING, |id| id.0))
    .fetch_optional(&mut *conn)
    .await?;

    Ok(room_number.map(RoomNumber))
}

pub(crate) async fn unit_is_free_in(
    conn: &mut SqliteConnection,
    room_number: RoomNumber,
    stay: &StayInterval,
    ignoring: Option<BookingId>,
) -> Result<bool, RepositoryError> {
    let conflicts: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM booking
         WHERE room_number = ?1 AND check_in < ?3 AND ?2 < check_out AND id <> ?4",
    )
    .bind(room_number.0)
    .bind(date_text(stay.check_in()))
    .bind(date_text(stay.check_out()))
    .bind(ignoring.map_or(NO_BOOKING, |id| id.0))
    .fetch_one(&mut *conn)
    .await?;

    Ok(conflicts == 0)
}

pub(crate) async fn unit_in(
    conn: &mut SqliteConnection,
    room_number: RoomNumber,
) -> Result<Option<RoomUnit>, RepositoryError> {
    let row = sqlx::query("SELECT room_number, category_id, status FROM room_unit WHERE room_number = ?1")
        .bind(room_number.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(row_to_unit).transpose()
}

/// Serialises writers per category. Bumping the version is the first write of
/// every mutating transaction, so the write lock is held before any
/// availability read.
pub(crate) async fn lock_categories_in(
    conn: &mut SqliteConnection,
    categories: &[CategoryId],
) -> Result<(), RepositoryError> {
    let mut ordered = categories.to_vec();
    ordered.sort_by_key(|id| id.0);
    ordered.dedup();

    for category_id in ordered {
        sqlx::query("UPDATE room_category SET lock_version = lock_version + 1 WHERE id = ?1")
            .bind(category_id.0)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn set_unit_status_in(
    conn: &mut SqliteConnection,
    room_number: RoomNumber,
    status: RoomStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE room_unit SET status = ?1 WHERE room_number = ?2")
        .bind(status.as_str())
        .bind(room_number.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Marks the unit vacant once it no longer carries any booking.
pub(crate) async fn release_unit_if_idle_in(
    conn: &mut SqliteConnection,
    room_number: RoomNumber,
) -> Result<(), RepositoryError> {
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM booking WHERE room_number = ?1")
        .bind(room_number.0)
        .fetch_one(&mut *conn)
        .await?;

    if remaining == 0 {
        set_unit_status_in(conn, room_number, RoomStatus::Vacant).await?;
    }
    Ok(())
}

fn row_to_unit(row: &SqliteRow) -> Result<RoomUnit, RepositoryError> {
    let status: String = column(row, "status")?;
    Ok(RoomUnit {
        number: RoomNumber(column(row, "room_number")?),
        category_id: CategoryId(column(row, "category_id")?),
        status: RoomStatus::parse(&status),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{find_available_unit_in, lock_categories_in, SqlInventoryRepository};
    use concierge_core::domain::booking::StayInterval;
    use concierge_core::domain::room::{CategoryId, RoomNumber, RoomStatus};

    use crate::fixtures::SeedDataset;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedDataset::load(&pool).await.expect("seed");
        pool
    }

    fn stay(from: u32, to: u32) -> StayInterval {
        StayInterval::new(
            NaiveDate::from_ymd_opt(2026, 1, from).expect("date"),
            NaiveDate::from_ymd_opt(2026, 1, to).expect("date"),
        )
        .expect("stay")
    }

    async fn book_raw(pool: &DbPool, room: i64, from: &str, to: &str) {
        sqlx::query(
            "INSERT OR IGNORE INTO guest (id, name, email, created_at, updated_at)
             VALUES (1, 'A', 'a@x.com', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(pool)
        .await
        .expect("guest");
        sqlx::query(
            "INSERT INTO booking (guest_id, category_id, room_number, check_in, check_out,
                                  base_cost, total_bill, created_at, updated_at)
             VALUES (1, ?1 / 100, ?1, ?2, ?3, '0', '0', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(room)
        .bind(from)
        .bind(to)
        .execute(pool)
        .await
        .expect("booking");
    }

    #[tokio::test]
    async fn units_are_numbered_per_category() {
        let inventory = SqlInventoryRepository::new(seeded_pool().await);
        let units = inventory.list_units(CategoryId(3)).await.expect("units");

        let numbers: Vec<i64> = units.iter().map(|unit| unit.number.0).collect();
        assert_eq!(numbers, vec![301, 302, 303, 304, 305]);
        assert!(units.iter().all(|unit| unit.status == RoomStatus::Vacant));
    }

    #[tokio::test]
    async fn lowest_free_room_number_is_chosen() {
        let pool = seeded_pool().await;
        book_raw(&pool, 101, "2026-01-22", "2026-01-24").await;
        book_raw(&pool, 102, "2026-01-20", "2026-01-23").await;

        let inventory = SqlInventoryRepository::new(pool);
        let unit = inventory.find_available_unit(CategoryId(1), &stay(22, 24)).await.expect("find");
        assert_eq!(unit, Some(RoomNumber(103)));

        let back_to_back =
            inventory.find_available_unit(CategoryId(1), &stay(24, 26)).await.expect("find");
        assert_eq!(back_to_back, Some(RoomNumber(101)));
    }

    #[tokio::test]
    async fn fully_booked_category_has_no_unit() {
        let pool = seeded_pool().await;
        for room in 101..=105 {
            book_raw(&pool, room, "2026-01-22", "2026-01-24").await;
        }

        let inventory = SqlInventoryRepository::new(pool.clone());
        assert_eq!(inventory.find_available_unit(CategoryId(1), &stay(23, 25)).await.expect("find"), None);
        assert!(inventory.find_available_unit(CategoryId(2), &stay(23, 25)).await.expect("find").is_some());

        let mut tx = pool.begin().await.expect("begin");
        lock_categories_in(&mut *tx, &[CategoryId(1), CategoryId(1)]).await.expect("lock");
        let own = find_available_unit_in(
            &mut *tx,
            CategoryId(1),
            &stay(22, 24),
            Some(concierge_core::BookingId(1)),
        )
        .await
        .expect("find");
        assert_eq!(own, Some(RoomNumber(101)));
        tx.rollback().await.expect("rollback");
    }

    #[tokio::test]
    async fn occupancy_follows_half_open_stays() {
        let pool = seeded_pool().await;
        book_raw(&pool, 201, "2026-01-22", "2026-01-24").await;
        let inventory = SqlInventoryRepository::new(pool);

        let day = |d: u32| NaiveDate::from_ymd_opt(2026, 1, d).expect("date");
        assert!(inventory.unit_occupancy(RoomNumber(201), day(22)).await.expect("occ").is_some());
        assert!(inventory.unit_occupancy(RoomNumber(201), day(23)).await.expect("occ").is_some());
        assert!(inventory.unit_occupancy(RoomNumber(201), day(24)).await.expect("occ").is_none());
        assert!(inventory.unit_occupancy(RoomNumber(202), day(22)).await.expect("occ").is_none());
    }
}
