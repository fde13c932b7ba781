pub mod connection;
pub mod fixtures;
pub mod ledger;
pub mod migrations;
pub mod mirror;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{SeedDataset, SeedResult, VerificationResult};
pub use ledger::BookingLedger;
pub use mirror::{BillingMirror, FileBillingMirror, InMemoryBillingMirror, MirrorError};
pub use repositories::{BookingRepository, CatalogRepository, RepositoryError};
