use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use concierge_core::domain::room::{CategoryId, RoomCategory};
use concierge_core::domain::service::{MenuItemId, ServiceMenuItem};

use super::{column, parse_money, CatalogRepository, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_room_categories(&self) -> Result<Vec<RoomCategory>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, nightly_rate FROM room_category ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_category).collect()
    }

    async fn find_room_category(
        &self,
        fragment: &str,
    ) -> Result<Option<RoomCategory>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_category_in(&mut conn, fragment).await
    }

    async fn find_room_category_by_id(
        &self,
        id: CategoryId,
    ) -> Result<Option<RoomCategory>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        category_by_id_in(&mut conn, id).await
    }

    async fn list_service_menu(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<ServiceMenuItem>, RepositoryError> {
        let rows = match category.map(str::trim).filter(|value| !value.is_empty()) {
            Some(category) => {
                sqlx::query(
                    "SELECT id, category, sub_type, item_name, price
                     FROM service_menu_item
                     WHERE category = ?1 COLLATE NOCASE
                     ORDER BY id",
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, category, sub_type, item_name, price
                     FROM service_menu_item ORDER BY id",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_menu_item).collect()
    }

    async fn find_menu_item(
        &self,
        name: &str,
    ) -> Result<Option<ServiceMenuItem>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_menu_item_in(&mut conn, name).await
    }
}

pub(crate) async fn find_category_in(
    conn: &mut SqliteConnection,
    fragment: &str,
) -> Result<Option<RoomCategory>, RepositoryError> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return Ok(None);
    }

    let row = sqlx::query(
        "SELECT id, name, nightly_rate
         FROM room_category
         WHERE instr(lower(name), lower(?1)) > 0
         ORDER BY lower(name) = lower(?1) DESC, id ASC
         LIMIT 1",
    )
    .bind(fragment)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(row_to_category).transpose()
}

pub(crate) async fn category_by_id_in(
    conn: &mut SqliteConnection,
    id: CategoryId,
) -> Result<Option<RoomCategory>, RepositoryError> {
    let row = sqlx::query("SELECT id, name, nightly_rate FROM room_category WHERE id = ?1")
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(row_to_category).transpose()
}

pub(crate) async fn find_menu_item_in(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<ServiceMenuItem>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, category, sub_type, item_name, price
         FROM service_menu_item
         WHERE item_name = ?1 COLLATE NOCASE
         LIMIT 1",
    )
    .bind(name.trim())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(row_to_menu_item).transpose()
}

fn row_to_category(row: &SqliteRow) -> Result<RoomCategory, RepositoryError> {
    let rate: String = column(row, "nightly_rate")?;
    Ok(RoomCategory {
        id: CategoryId(column(row, "id")?),
        name: column(row, "name")?,
        nightly_rate: parse_money("nightly_rate", &rate)?,
    })
}

fn row_to_menu_item(row: &SqliteRow) -> Result<ServiceMenuItem, RepositoryError> {
    let price: String = column(row, "price")?;
    Ok(ServiceMenuItem {
        id: MenuItemId(column(row, "id")?),
        category: column(row, "category")?,
        sub_type: column(row, "sub_type")?,
        item_name: column(row, "item_name")?,
        price: parse_money("price", &price)?,
    })
}
