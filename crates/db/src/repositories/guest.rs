use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use concierge_core::domain::guest::{normalize_email, Guest, GuestContact, GuestId};

use super::{column, money_text, parse_money, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlGuestRepository {
    pool: DbPool,
}

impl SqlGuestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Guest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, total_spent FROM guest WHERE email = ?1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_guest).transpose()
    }
}

/// Creates the guest or refreshes name and phone of the existing record.
pub(crate) async fn upsert_guest_in(
    conn: &mut SqliteConnection,
    contact: &GuestContact,
    now: DateTime<Utc>,
) -> Result<GuestId, RepositoryError> {
    let email = normalize_email(&contact.email);
    let timestamp = now.to_rfc3339();

    sqlx::query(
        "INSERT INTO guest (name, email, phone, total_spent, created_at, updated_at)
         VALUES (?1, ?2, ?3, '0', ?4, ?4)
         ON CONFLICT(email) DO UPDATE SET
             name = excluded.name,
             phone = excluded.phone,
             updated_at = excluded.updated_at",
    )
    .bind(contact.name.trim())
    .bind(&email)
    .bind(contact.phone.trim())
    .bind(&timestamp)
    .execute(&mut *conn)
    .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM guest WHERE email = ?1")
        .bind(&email)
        .fetch_one(&mut *conn)
        .await?;

    Ok(GuestId(id))
}

/// Applies a signed delta to the guest's lifetime spend.
pub(crate) async fn adjust_total_spent_in(
    conn: &mut SqliteConnection,
    guest_id: GuestId,
    delta: Decimal,
) -> Result<(), RepositoryError> {
    if delta.is_zero() {
        return Ok(());
    }

    let current: String = sqlx::query_scalar("SELECT total_spent FROM guest WHERE id = ?1")
        .bind(guest_id.0)
        .fetch_one(&mut *conn)
        .await?;
    let updated = parse_money("total_spent", &current)? + delta;

    sqlx::query("UPDATE guest SET total_spent = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(money_text(updated))
        .bind(Utc::now().to_rfc3339())
        .bind(guest_id.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn row_to_guest(row: &SqliteRow) -> Result<Guest, RepositoryError> {
    let total_spent: String = column(row, "total_spent")?;
    Ok(Guest {
        id: GuestId(column(row, "id")?),
        name: column(row, "name")?,
        email: column(row, "email")?,
        phone: column(row, "phone")?,
        total_spent: parse_money("total_spent", &total_spent)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{adjust_total_spent_in, upsert_guest_in, SqlGuestRepository};
    use concierge_core::domain::guest::GuestContact;

    use crate::{connect_with_settings, migrations, DbPool};

    async fn pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn repeat_guests_keep_one_record_keyed_by_email() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.expect("conn");

        let first = upsert_guest_in(&mut conn, &GuestContact::new("Ada", "ada@x.com", "1"), Utc::now())
            .await
            .expect("insert");
        let second = upsert_guest_in(
            &mut conn,
            &GuestContact { name: "Ada L.".to_string(), email: " ADA@x.com".to_string(), phone: "2".to_string() },
            Utc::now(),
        )
        .await
        .expect("update");
        drop(conn);

        assert_eq!(first, second);
        let guest = SqlGuestRepository::new(pool).find_by_email("Ada@X.com").await.expect("find").expect("guest");
        assert_eq!(guest.name, "Ada L.");
        assert_eq!(guest.phone, "2");
        assert_eq!(guest.total_spent, Decimal::ZERO);
    }

    #[tokio::test]
    async fn spend_adjustments_accumulate_and_can_be_negative() {
        let pool = pool().await;
        let mut conn = pool.acquire().await.expect("conn");
        let id = upsert_guest_in(&mut conn, &GuestContact::new("Bo", "bo@x.com", ""), Utc::now())
            .await
            .expect("insert");

        adjust_total_spent_in(&mut conn, id, Decimal::new(32460, 0)).await.expect("add");
        adjust_total_spent_in(&mut conn, id, Decimal::new(750, 0)).await.expect("add");
        adjust_total_spent_in(&mut conn, id, Decimal::new(-16230, 0)).await.expect("subtract");
        drop(conn);

        let guest = SqlGuestRepository::new(pool).find_by_email("bo@x.com").await.expect("find").expect("guest");
        assert_eq!(guest.total_spent, Decimal::new(16980, 0));
    }
}
