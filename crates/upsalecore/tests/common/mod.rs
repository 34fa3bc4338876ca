//! Common test utilities
//!
//! Every test gets its own SQLite file inside a temp directory, seeded with
//! the same small catalog:
//!
//! | unit | product      | pack | price |
//! |------|--------------|------|-------|
//! | 1    | 1 Kenya AA   | 250г | 10    |
//! | 2    | 1 Kenya AA   | 500г | 25    |
//! | 3    | 2 Ethiopia   | 250г | 30    |

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;
use upsalecore::shop::{BuyerProfile, CartPolicy, Event, Reply, Shop};
use upsalecore::storage::{CatalogFile, SqliteStore};

pub const CATALOG_JSON: &str = r#"{
  "products": [
    {
      "name": "Kenya AA",
      "description": "Blackcurrant, grapefruit, bright acidity",
      "image": "https://example.com/kenya.jpg",
      "packs": [
        { "unit": "г", "size": 250, "price": "10" },
        { "unit": "г", "size": 500, "price": "25" }
      ]
    },
    {
      "name": "Ethiopia Guji",
      "description": "Peach, jasmine",
      "image": "https://example.com/guji.jpg",
      "packs": [
        { "unit": "г", "size": 250, "price": "30" }
      ]
    }
  ]
}"#;

pub struct TestShop {
    pub shop: Arc<Shop<SqliteStore>>,
    // Keeps the database file alive for the duration of the test
    _dir: TempDir,
}

impl TestShop {
    pub fn new() -> Self {
        Self::with_policy(CartPolicy::default())
    }

    pub fn with_policy(policy: CartPolicy) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upsale-test.sqlite");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        store
            .import_catalog(&CatalogFile::from_json(CATALOG_JSON).unwrap())
            .unwrap();

        Self {
            shop: Arc::new(Shop::new(Arc::new(store), policy)),
            _dir: dir,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        self.shop.store()
    }

    pub async fn send(&self, event: Event) -> Vec<Reply> {
        self.shop.handle(event).await.unwrap()
    }

    /// Registers the buyer the way `/start` does.
    pub async fn start(&self, buyer_id: i64) -> BuyerProfile {
        let profile = profile(buyer_id);
        self.send(Event::Start(profile.clone())).await;
        profile
    }

    pub async fn press(&self, buyer_id: i64, data: &str) -> Vec<Reply> {
        self.send(Event::Callback {
            buyer_id,
            data: data.to_string(),
        })
        .await
    }

    pub async fn say(&self, profile: &BuyerProfile, text: &str) -> Vec<Reply> {
        self.send(Event::Text {
            profile: profile.clone(),
            text: text.to_string(),
        })
        .await
    }
}

pub fn profile(id: i64) -> BuyerProfile {
    BuyerProfile {
        id,
        first_name: "Olena".to_string(),
        last_name: Some("Koval".to_string()),
        username: Some(format!("buyer{}", id)),
        language_code: Some("uk".to_string()),
        is_bot: false,
    }
}
