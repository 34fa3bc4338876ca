//! Cart handling through the router, backed by a real SQLite file.
//!
//! Run with: cargo test -p upsalecore --test cart_flow_test

mod common;

use common::{profile, TestShop};
use pretty_assertions::assert_eq;
use upsalecore::core::types::Price;
use upsalecore::shop::{CartPolicy, Event, MenuButton, Notice, Reply, View};
use upsalecore::storage::{BuyerRepository, CartRepository};

const BUYER: i64 = 4242;

fn quantity(t: &TestShop, unit_id: i64) -> Option<u32> {
    t.store().load_cart(BUYER).unwrap().quantity_of(unit_id)
}

fn total(t: &TestShop) -> Price {
    t.store().load_cart(BUYER).unwrap().total_price()
}

#[tokio::test]
async fn test_start_registers_buyer_once() {
    let t = TestShop::new();

    let replies = t.send(Event::Start(profile(BUYER))).await;
    assert_eq!(replies, vec![Reply::Send(View::Welcome)]);
    t.send(Event::Start(profile(BUYER))).await;

    let buyer = t.store().buyer(BUYER).unwrap().unwrap();
    assert_eq!(buyer.name, "@buyer4242");
    assert_eq!(buyer.full_name, "Olena Koval");
    assert_eq!(buyer.link.as_deref(), Some("https://t.me/buyer4242"));
    assert!(t.store().load_cart(BUYER).unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_lists_every_product() {
    let t = TestShop::new();
    let profile = t.start(BUYER).await;

    let replies = t.say(&profile, MenuButton::Products.label()).await;

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0], Reply::Send(View::Catalog));
    match &replies[1] {
        Reply::Send(View::ProductCard { listing, expanded }) => {
            assert_eq!(listing.product.name, "Kenya AA");
            assert_eq!(listing.min_price(), Some(Price::from_major(10)));
            assert!(!expanded);
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

#[tokio::test]
async fn test_description_toggles_card() {
    let t = TestShop::new();
    t.start(BUYER).await;

    let replies = t.press(BUYER, "description:1").await;
    assert!(matches!(
        &replies[..],
        [Reply::EditCurrent(View::ProductCard { expanded: true, .. })]
    ));

    let replies = t.press(BUYER, "product:1").await;
    assert!(matches!(
        &replies[..],
        [Reply::EditCurrent(View::ProductCard { expanded: false, .. })]
    ));
}

#[tokio::test]
async fn test_add_to_cart_marks_option_in_cart() {
    let t = TestShop::new();
    t.start(BUYER).await;

    let replies = t.press(BUYER, "add_to_cart:1").await;
    match &replies[..] {
        [Reply::EditCurrent(View::PriceSelection { options, .. })] => {
            let in_cart: Vec<(i64, bool)> = options.iter().map(|o| (o.unit_id, o.in_cart)).collect();
            assert_eq!(in_cart, vec![(1, true), (2, false)]);
            assert_eq!(options[0].label, "250г");
        }
        other => panic!("unexpected replies {:?}", other),
    }

    // A stale keyboard pressed again does not add a second unit
    t.press(BUYER, "add_to_cart:1").await;
    assert_eq!(quantity(&t, 1), Some(1));
}

#[tokio::test]
async fn test_plus_minus_remove_scenario() {
    let t = TestShop::new();
    t.start(BUYER).await;

    t.press(BUYER, "add_to_cart:1").await;
    t.press(BUYER, "plus_one:1").await;
    t.press(BUYER, "add_to_cart:2").await;
    assert_eq!(total(&t), Price::from_major(45));

    t.press(BUYER, "minus_one:1").await;
    assert_eq!(quantity(&t, 1), Some(1));
    assert_eq!(total(&t), Price::from_major(35));

    // Unit 2 of the same product remains, so the card is edited, not deleted
    let replies = t.press(BUYER, "remove_one:1").await;
    assert!(matches!(&replies[..], [Reply::EditCurrent(View::CartGroup { lines, .. })] if lines.len() == 1));
    assert_eq!(quantity(&t, 1), None);
    assert_eq!(total(&t), Price::from_major(25));

    let replies = t.press(BUYER, "remove_one:2").await;
    assert_eq!(replies, vec![Reply::DeleteCurrent]);
    assert!(t.store().load_cart(BUYER).unwrap().is_empty());
}

#[tokio::test]
async fn test_plus_one_stops_at_maximum() {
    let t = TestShop::new();
    t.start(BUYER).await;
    t.press(BUYER, "add_to_cart:3").await;

    let mut last = Vec::new();
    for _ in 0..15 {
        last = t.press(BUYER, "plus_one:3").await;
    }

    assert_eq!(quantity(&t, 3), Some(10));
    assert_eq!(last, vec![Reply::Toast(Notice::MaxQuantity(10))]);
}

#[tokio::test]
async fn test_custom_policy_maximum() {
    let t = TestShop::with_policy(CartPolicy::new(1, 3));
    t.start(BUYER).await;
    t.press(BUYER, "add_to_cart:3").await;

    for _ in 0..15 {
        t.press(BUYER, "plus_one:3").await;
    }
    assert_eq!(quantity(&t, 3), Some(3));
}

#[tokio::test]
async fn test_minus_one_stops_at_floor() {
    let t = TestShop::new();
    t.start(BUYER).await;
    t.press(BUYER, "add_to_cart:1").await;

    let replies = t.press(BUYER, "minus_one:1").await;

    assert_eq!(replies, vec![Reply::Toast(Notice::MinQuantity(1))]);
    assert_eq!(quantity(&t, 1), Some(1));
}

#[tokio::test]
async fn test_total_message_is_refreshed() {
    let t = TestShop::new();
    let profile = t.start(BUYER).await;
    t.press(BUYER, "add_to_cart:1").await;

    let replies = t.say(&profile, MenuButton::Cart.label()).await;
    assert_eq!(replies.first(), Some(&Reply::Send(View::CartHeader)));
    assert_eq!(
        replies.last(),
        Some(&Reply::Send(View::CartTotal {
            total: Price::from_major(10)
        }))
    );
    t.shop.remember_total_message(BUYER, 555).await.unwrap();

    let replies = t.press(BUYER, "plus_one:1").await;
    assert_eq!(
        replies.last(),
        Some(&Reply::RefreshTotal {
            message_id: 555,
            total: Price::from_major(20)
        })
    );
}

#[tokio::test]
async fn test_clean_cart_forgets_total_message() {
    let t = TestShop::new();
    t.start(BUYER).await;
    t.press(BUYER, "add_to_cart:1").await;
    t.shop.remember_total_message(BUYER, 555).await.unwrap();

    t.press(BUYER, "clean_cart").await;
    assert_eq!(t.store().load_cart(BUYER).unwrap().total_message_id(), None);

    // The old total message is far up the chat; nothing points at it any more
    let replies = t.press(BUYER, "add_to_cart:1").await;
    assert!(!replies.iter().any(|r| matches!(r, Reply::RefreshTotal { .. })));
}

#[tokio::test]
async fn test_total_message_remembered_alongside_press() {
    let t = TestShop::new();
    t.start(BUYER).await;
    t.press(BUYER, "add_to_cart:1").await;

    let (replies, remembered) = tokio::join!(
        t.press(BUYER, "plus_one:1"),
        t.shop.remember_total_message(BUYER, 777)
    );
    remembered.unwrap();
    assert!(!replies.is_empty());
    assert_eq!(quantity(&t, 1), Some(2));

    assert_eq!(t.store().load_cart(BUYER).unwrap().total_message_id(), Some(777));
    let replies = t.press(BUYER, "plus_one:1").await;
    assert_eq!(
        replies.last(),
        Some(&Reply::RefreshTotal {
            message_id: 777,
            total: Price::from_major(30)
        })
    );
}

#[tokio::test]
async fn test_clean_cart_empties_everything() {
    let t = TestShop::new();
    let profile = t.start(BUYER).await;
    t.press(BUYER, "add_to_cart:1").await;
    t.press(BUYER, "add_to_cart:3").await;

    let replies = t.press(BUYER, "clean_cart").await;

    assert_eq!(replies, vec![Reply::Send(View::CartCleared), Reply::Send(View::Welcome)]);
    assert!(t.store().load_cart(BUYER).unwrap().is_empty());
    assert_eq!(total(&t), Price::ZERO);
    assert_eq!(
        t.say(&profile, MenuButton::Cart.label()).await,
        vec![Reply::Send(View::CartEmpty)]
    );
}

#[tokio::test]
async fn test_bad_payloads_are_absorbed() {
    let t = TestShop::new();
    t.start(BUYER).await;

    assert!(t.press(BUYER, "{0: 1, 1: 'plus_one'}").await.is_empty());
    assert!(t.press(BUYER, "noop").await.is_empty());
    assert_eq!(
        t.press(BUYER, "show_prices:999").await,
        vec![Reply::Toast(Notice::Unavailable)]
    );
    assert_eq!(
        t.press(BUYER, "plus_one:1").await,
        vec![Reply::Toast(Notice::Unavailable)]
    );
}

#[tokio::test]
async fn test_unknown_buyer_is_asked_to_start() {
    let t = TestShop::new();

    let replies = t.press(BUYER, "add_to_cart:1").await;

    assert_eq!(replies, vec![Reply::Send(View::StartRequired)]);
}

#[tokio::test]
async fn test_concurrent_presses_are_not_lost() {
    let t = TestShop::new();
    t.start(BUYER).await;
    t.press(BUYER, "add_to_cart:2").await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let shop = t.shop.clone();
        handles.push(tokio::spawn(async move {
            shop.handle(Event::Callback {
                buyer_id: BUYER,
                data: "plus_one:2".to_string(),
            })
            .await
            .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(quantity(&t, 2), Some(7));
}
