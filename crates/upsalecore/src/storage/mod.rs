//! SQLite persistence: pool, migrations, repositories and catalog import.

pub mod catalog_import;
pub mod db;
pub mod migrations;
pub mod repo;
pub mod sqlite;

pub use catalog_import::{CatalogFile, ImportReport};
pub use db::{create_pool, get_connection, DbConnection, DbPool};
pub use migrations::run_migrations;
pub use repo::{BuyerRepository, CartRepository, CatalogRepository, OrderRepository, ShopStore};
pub use sqlite::SqliteStore;
