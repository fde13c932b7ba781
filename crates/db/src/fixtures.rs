use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Room categories with their nightly rates, in id order.
pub const ROOM_CATEGORIES: &[(&str, &str)] = &[
    ("Deluxe King", "16230"),
    ("Deluxe Twin", "16230"),
    ("Premier King", "24645"),
    ("Premier Twin", "24645"),
    ("Pacific Club Twin", "36066"),
    ("Junior Suite", "48088"),
    ("Executive Suite", "54100"),
    ("Bengali Suite", "60110"),
    ("International Suite", "72132"),
];

/// Units per category; unit numbers are `category_id * 100 + 1..=UNITS_PER_CATEGORY`.
pub const UNITS_PER_CATEGORY: i64 = 5;

/// `(category, sub_type, item_name, price)`.
pub const SERVICE_MENU: &[(&str, &str, &str, &str)] = &[
    ("Food", "Breakfast", "Breakfast Buffet", "4000"),
    ("Food", "Breakfast", "Continental Platter", "1200"),
    ("Food", "Breakfast", "Pancakes with Syrup", "950"),
    ("Food", "Breakfast", "Omelette & Toast", "800"),
    ("Food", "Lunch", "Lunch Buffet", "5500"),
    ("Food", "Lunch", "Burger & Fries", "1100"),
    ("Food", "Lunch", "Chicken Caesar Salad", "850"),
    ("Food", "Lunch", "Pasta Alfredo", "1400"),
    ("Food", "Snacks", "Club Sandwich", "750"),
    ("Food", "Snacks", "French Fries", "600"),
    ("Food", "Snacks", "Mineral Water (1L)", "150"),
    ("Food", "Dinner", "Dinner Buffet", "9000"),
    ("Food", "Dinner", "Grilled Salmon", "2200"),
    ("Food", "Dinner", "Ribeye Steak", "3500"),
    ("Food", "Dinner", "Seafood Platter", "15000"),
    ("Food", "Cafe", "Coffee / Tea", "600"),
    ("Food", "Cafe", "Pastry Slice", "900"),
    ("Food", "Cafe", "Whole Cake", "6000"),
    ("Food", "Bar", "Signature Cocktail", "2500"),
    ("Food", "Bar", "Premium Spirit", "4000"),
    ("Food", "Bar", "Bar Snacks", "1800"),
    ("Food", "In-Room", "In-Room Meal Delivery", "0"),
    ("Food", "In-Room", "Room Service Charge", "500"),
    ("Food", "In-Room", "Late Night Service Fee", "500"),
    ("Food", "Special", "Themed Buffet Night", "8000"),
    ("Food", "Special", "Guest Chef Event", "12000"),
    ("Laundry", "Standard", "Wash & Fold (Per Load)", "800"),
    ("Laundry", "Standard", "Wash & Iron (Per Load)", "1200"),
    ("Laundry", "Standard", "Ironing Only (Per Item)", "300"),
    ("Laundry", "Special", "Dry Clean Suit", "1500"),
    ("Laundry", "Special", "Stain Removal", "600"),
    ("Laundry", "Express", "Express Laundry Surcharge", "300"),
    ("Housekeeping", "General", "Daily Room Cleaning", "0"),
    ("Housekeeping", "General", "Linen & Towel Change", "0"),
    ("Housekeeping", "General", "Toiletries Refill", "0"),
    ("Housekeeping", "General", "Evening Turndown Service", "0"),
    ("Housekeeping", "Special", "Deep Cleaning", "2500"),
    ("Housekeeping", "Special", "Room Sanitization", "1500"),
    ("Housekeeping", "Special", "Extra Cleaning Visit", "1200"),
    ("Housekeeping", "Special", "Pet Cleaning Fee", "3500"),
    ("Medical", "Emergency", "Emergency Response", "0"),
    ("Medical", "Emergency", "CPR / BLS Support", "0"),
    ("Medical", "Emergency", "Basic First Aid", "0"),
    ("Medical", "General", "Doctor on Call", "5000"),
    ("Medical", "General", "Medication Supply", "1000"),
    ("Medical", "General", "Vital Monitoring", "2500"),
    ("Medical", "Transport", "Ambulance Service", "6000"),
    ("Medical", "Transport", "Medical Escort", "3000"),
    ("Bellhop", "General", "Luggage Pickup", "0"),
    ("Bellhop", "General", "Luggage Drop-off", "0"),
    ("Bellhop", "General", "Valet Retrieval", "0"),
    ("Bellhop", "General", "Airport Luggage Assistance", "1500"),
    ("Facilities", "Fitness", "Gym Access", "0"),
    ("Facilities", "Fitness", "Group Fitness Class", "1200"),
    ("Facilities", "Fitness", "Personal Trainer", "3500"),
    ("Facilities", "Pool", "Swimming Pool Access", "0"),
    ("Facilities", "Pool", "Pool Cabana", "4000"),
    ("Facilities", "Pool", "Extra Pool Towel", "200"),
    ("Facilities", "Spa", "Massage Therapy", "8000"),
    ("Facilities", "Spa", "Facial Treatment", "5000"),
    ("Facilities", "Spa", "Sauna / Steam", "2500"),
    ("Facilities", "Spa", "Spa Package", "15000"),
    ("Facilities", "Business", "Meeting Room", "10000"),
    ("Facilities", "Business", "Conference Hall", "100000"),
    ("Facilities", "Business", "AV Equipment Setup", "6000"),
    ("Facilities", "Family", "Kids Club Access", "0"),
    ("Facilities", "Family", "Babysitting Service", "2500"),
    ("Facilities", "Transport", "Shuttle Service", "2000"),
];

/// Deterministic hotel reference data: categories, their units and the
/// service menu. Loading is idempotent and never touches bookings.
pub struct SeedDataset;

impl SeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        let mut inserted_rows = 0_u64;

        for (name, rate) in ROOM_CATEGORIES {
            inserted_rows += sqlx::query(
                "INSERT OR IGNORE INTO room_category (name, nightly_rate) VALUES (?1, ?2)",
            )
            .bind(name)
            .bind(rate)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let category_id: i64 = sqlx::query_scalar("SELECT id FROM room_category WHERE name = ?1")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;

            for offset in 1..=UNITS_PER_CATEGORY {
                inserted_rows += sqlx::query(
                    "INSERT OR IGNORE INTO room_unit (room_number, category_id, status)
                     VALUES (?1, ?2, 'Vacant')",
                )
                .bind(category_id * 100 + offset)
                .bind(category_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            }
        }

        for (category, sub_type, item_name, price) in SERVICE_MENU {
            inserted_rows += sqlx::query(
                "INSERT OR IGNORE INTO service_menu_item (category, sub_type, item_name, price)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(category)
            .bind(sub_type)
            .bind(item_name)
            .bind(price)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        Ok(SeedResult {
            categories: ROOM_CATEGORIES.len(),
            units: ROOM_CATEGORIES.len() * UNITS_PER_CATEGORY as usize,
            menu_items: SERVICE_MENU.len(),
            inserted_rows,
        })
    }

    /// Checks that every seeded row exists with its seeded values.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let mut categories_ok = true;
        let mut units_ok = true;
        for (name, rate) in ROOM_CATEGORIES {
            let row: Option<(i64, String)> =
                sqlx::query_as("SELECT id, nightly_rate FROM room_category WHERE name = ?1")
                    .bind(name)
                    .fetch_optional(pool)
                    .await?;

            let Some((category_id, stored_rate)) = row else {
                categories_ok = false;
                units_ok = false;
                continue;
            };
            categories_ok &= stored_rate == *rate;

            let units: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM room_unit
                 WHERE category_id = ?1 AND room_number BETWEEN ?2 AND ?3",
            )
            .bind(category_id)
            .bind(category_id * 100 + 1)
            .bind(category_id * 100 + UNITS_PER_CATEGORY)
            .fetch_one(pool)
            .await?;
            units_ok &= units == UNITS_PER_CATEGORY;
        }
        checks.push(("room-categories", categories_ok));
        checks.push(("room-units", units_ok));

        let mut menu_ok = true;
        for (category, sub_type, item_name, price) in SERVICE_MENU {
            let matching: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM service_menu_item
                 WHERE item_name = ?1 AND category = ?2 AND sub_type = ?3 AND price = ?4",
            )
            .bind(item_name)
            .bind(category)
            .bind(sub_type)
            .bind(price)
            .fetch_one(pool)
            .await?;
            menu_ok &= matching == 1;
        }
        checks.push(("service-menu", menu_ok));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub categories: usize,
    pub units: usize,
    pub menu_items: usize,
    /// Rows written by this load; zero when everything was already present.
    pub inserted_rows: u64,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn seed_constants_have_unique_names() {
        let categories: HashSet<_> = ROOM_CATEGORIES.iter().map(|(name, _)| *name).collect();
        assert_eq!(categories.len(), ROOM_CATEGORIES.len());

        let items: HashSet<_> = SERVICE_MENU.iter().map(|(_, _, name, _)| *name).collect();
        assert_eq!(items.len(), SERVICE_MENU.len());

        assert!(SERVICE_MENU
            .iter()
            .all(|(_, _, _, price)| price.parse::<rust_decimal::Decimal>().is_ok()));
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        let empty = SeedDataset::verify(&pool).await.expect("verify empty database");
        assert!(!empty.all_present);

        let first = SeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = SeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.categories, 9);
        assert_eq!(first.units, 45);
        assert!(first.inserted_rows > 0);

        let second = SeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            SeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.inserted_rows, 0);
        assert_eq!(first_verification.checks, second_verification.checks);

        let units: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM room_unit")
            .fetch_one(&pool)
            .await
            .expect("count units");
        assert_eq!(units, 45);
    }

    #[tokio::test]
    async fn verify_detects_tampered_rates() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        SeedDataset::load(&pool).await.expect("load seed fixtures");

        sqlx::query("UPDATE room_category SET nightly_rate = '1' WHERE name = 'Junior Suite'")
            .execute(&pool)
            .await
            .expect("tamper");

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert!(verification.checks.contains(&("room-categories", false)));
        assert!(verification.checks.contains(&("room-units", true)));
    }

    #[tokio::test]
    async fn deluxe_king_units_are_101_to_105() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        SeedDataset::load(&pool).await.expect("load seed fixtures");

        let numbers: Vec<i64> = sqlx::query_scalar(
            "SELECT u.room_number FROM room_unit u
             JOIN room_category c ON c.id = u.category_id
             WHERE c.name = 'Deluxe King' ORDER BY u.room_number",
        )
        .fetch_all(&pool)
        .await
        .expect("units");
        assert_eq!(numbers, vec![101, 102, 103, 104, 105]);
    }
}
