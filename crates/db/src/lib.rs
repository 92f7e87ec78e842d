pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_file, connect_with_settings, DbPool, StoragePools};
pub use fixtures::{row_counts, SeedDataset, SeedResult, TableCount};
