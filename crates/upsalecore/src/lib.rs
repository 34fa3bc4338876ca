//! upsalecore - storefront domain and storage for the upsale bot
//!
//! Holds everything that does not talk to Telegram: the catalog and cart
//! model, the checkout gate, the conversation router and SQLite persistence.

pub mod core;
pub mod shop;
pub mod storage;

pub use crate::core::error::{ShopError, ShopResult};
pub use crate::shop::{Event, Reply, Shop, View};
pub use crate::storage::SqliteStore;
