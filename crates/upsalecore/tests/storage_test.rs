//! SQLite repository behaviour that the router relies on.
//!
//! Run with: cargo test -p upsalecore --test storage_test

mod common;

use common::{TestShop, CATALOG_JSON};
use pretty_assertions::assert_eq;
use upsalecore::core::error::ShopError;
use upsalecore::core::types::{OrderStatus, Price};
use upsalecore::storage::{CartRepository, CatalogFile, CatalogRepository, ImportReport, OrderRepository};

const BUYER: i64 = 31337;

#[tokio::test]
async fn test_place_order_on_empty_cart_writes_nothing() {
    let t = TestShop::new();
    t.start(BUYER).await;

    let err = t.store().place_order(BUYER).unwrap_err();

    assert!(matches!(err, ShopError::EmptyCart));
    assert!(t.store().orders(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_second_new_order_is_refused_and_cart_kept() {
    let t = TestShop::new();
    t.start(BUYER).await;
    t.store().put_line(BUYER, 1, 2).unwrap();
    let first = t.store().place_order(BUYER).unwrap();

    t.store().put_line(BUYER, 3, 1).unwrap();
    let err = t.store().place_order(BUYER).unwrap_err();

    assert!(matches!(err, ShopError::DuplicateOrder(BUYER)));
    assert_eq!(t.store().load_cart(BUYER).unwrap().quantity_of(3), Some(1));
    assert_eq!(t.store().order_lines(first.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_merge_cart_into_order() {
    let t = TestShop::new();
    t.start(BUYER).await;
    t.store().put_line(BUYER, 1, 9).unwrap();
    let order = t.store().place_order(BUYER).unwrap();

    t.store().put_line(BUYER, 1, 4).unwrap();
    t.store().put_line(BUYER, 2, 2).unwrap();
    assert_eq!(t.store().merge_cart_into_order(BUYER, order.id, 10).unwrap(), 2);

    assert!(t.store().load_cart(BUYER).unwrap().is_empty());
    let lines: Vec<(i64, u32)> = t
        .store()
        .order_lines(order.id)
        .unwrap()
        .iter()
        .map(|l| (l.unit.id, l.quantity))
        .collect();
    assert_eq!(lines, vec![(1, 10), (2, 2)]);

    // Nothing left to take
    assert_eq!(t.store().merge_cart_into_order(BUYER, order.id, 10).unwrap(), 0);
}

#[tokio::test]
async fn test_merge_refuses_foreign_or_closed_order() {
    let t = TestShop::new();
    t.start(BUYER).await;
    t.start(BUYER + 1).await;
    t.store().put_line(BUYER, 1, 1).unwrap();
    let order = t.store().place_order(BUYER).unwrap();

    t.store().put_line(BUYER + 1, 2, 1).unwrap();
    assert!(matches!(
        t.store().merge_cart_into_order(BUYER + 1, order.id, 10),
        Err(ShopError::NotFound { entity: "order", .. })
    ));
    assert_eq!(t.store().load_cart(BUYER + 1).unwrap().quantity_of(2), Some(1));

    t.store().set_status(order.id, OrderStatus::InProgress).unwrap();
    t.store().put_line(BUYER, 3, 1).unwrap();
    assert!(t.store().merge_cart_into_order(BUYER, order.id, 10).is_err());
    assert_eq!(t.store().order_lines(order.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_cart_lines_round_trip() {
    let t = TestShop::new();
    t.start(BUYER).await;

    t.store().put_line(BUYER, 2, 1).unwrap();
    t.store().put_line(BUYER, 2, 4).unwrap();
    t.store().put_line(BUYER, 3, 1).unwrap();
    t.store().set_total_message(BUYER, Some(99)).unwrap();

    let cart = t.store().load_cart(BUYER).unwrap();
    assert_eq!(cart.lines().len(), 2);
    assert_eq!(cart.quantity_of(2), Some(4));
    assert_eq!(cart.total_message_id(), Some(99));
    assert_eq!(cart.total_price(), Price::from_major(130));

    t.store().delete_line(BUYER, 2).unwrap();
    assert!(matches!(
        t.store().delete_line(BUYER, 2),
        Err(ShopError::NotFound { .. })
    ));
    assert_eq!(t.store().delete_all_lines(BUYER).unwrap(), 1);
}

#[tokio::test]
async fn test_reimport_updates_in_place() {
    let t = TestShop::new();

    let updated = CATALOG_JSON.replace(r#""price": "10""#, r#""price": "12.50""#);
    let report = t
        .store()
        .import_catalog(&CatalogFile::from_json(&updated).unwrap())
        .unwrap();

    assert_eq!(
        report,
        ImportReport {
            products_created: 0,
            products_updated: 2,
            packs_created: 0,
            units_created: 0,
            units_updated: 3,
        }
    );
    let unit = t.store().unit(1).unwrap().unwrap();
    assert_eq!(unit.price, Price::from_minor(1250));
    assert_eq!(t.store().listings().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_import_is_rolled_back() {
    let t = TestShop::new();
    let json = r#"{"products": [
        {"name": "Brazil", "image": "x", "packs": [{"unit": "г", "size": 250, "price": "5"}]},
        {"name": "Peru", "image": "x", "packs": [{"unit": "г", "size": 250, "price": "five"}]}
    ]}"#;

    assert!(t.store().import_catalog(&CatalogFile::from_json(json).unwrap()).is_err());
    assert_eq!(t.store().listings().unwrap().len(), 2);
}
