//! Renders every reply of a full shopping session and checks the keyboards
//! that would reach Telegram.
//!
//! Run with: cargo test -p upsale --test render_flow_test

use std::sync::Arc;

use tempfile::TempDir;
use teloxide::types::{InlineKeyboardButtonKind, ReplyMarkup};
use upsalebot::telegram::views::{render, Outgoing};
use upsalebot::telegram::{schema, HandlerDeps};
use upsalecore::shop::{BuyerProfile, CartPolicy, Callback, Event, MenuButton, Reply, Shop};
use upsalecore::storage::{CatalogFile, SqliteStore};

const CATALOG: &str = r#"{"products": [
    {"name": "Colombia Huila", "description": "Caramel", "image": "https://example.com/huila.jpg",
     "packs": [{"unit": "г", "size": 250, "price": "210"}, {"unit": "кг", "size": 1, "price": "720"}]}
]}"#;

fn shop(dir: &TempDir) -> Arc<Shop<SqliteStore>> {
    let path = dir.path().join("render.sqlite");
    let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
    store.import_catalog(&CatalogFile::from_json(CATALOG).unwrap()).unwrap();
    Arc::new(Shop::new(Arc::new(store), CartPolicy::default()))
}

fn profile() -> BuyerProfile {
    BuyerProfile {
        id: 100,
        first_name: "Taras".to_string(),
        last_name: None,
        username: None,
        language_code: None,
        is_bot: false,
    }
}

fn rendered(replies: &[Reply]) -> Vec<Outgoing> {
    replies
        .iter()
        .filter_map(|reply| match reply {
            Reply::Send(view) | Reply::EditCurrent(view) => Some(render(view)),
            _ => None,
        })
        .collect()
}

/// Every callback payload must decode and fit Telegram's 64 byte limit.
fn assert_payloads_valid(outgoing: &Outgoing) {
    let Some(ReplyMarkup::InlineKeyboard(keyboard)) = &outgoing.markup else {
        return;
    };
    for button in keyboard.inline_keyboard.iter().flatten() {
        if let InlineKeyboardButtonKind::CallbackData(data) = &button.kind {
            assert!(data.len() <= 64, "payload too long: {}", data);
            assert!(Callback::parse(data).is_ok(), "payload does not decode: {}", data);
        }
    }
}

#[tokio::test]
async fn test_session_renders_valid_keyboards() {
    let dir = TempDir::new().unwrap();
    let shop = shop(&dir);
    let buyer = profile();

    let events = vec![
        Event::Start(buyer.clone()),
        Event::Text {
            profile: buyer.clone(),
            text: MenuButton::Go.label().to_string(),
        },
        Event::Callback {
            buyer_id: buyer.id,
            data: "description:1".to_string(),
        },
        Event::Callback {
            buyer_id: buyer.id,
            data: "show_prices:1".to_string(),
        },
        Event::Callback {
            buyer_id: buyer.id,
            data: "add_to_cart:2".to_string(),
        },
        Event::Text {
            profile: buyer.clone(),
            text: MenuButton::Cart.label().to_string(),
        },
        Event::Text {
            profile: buyer.clone(),
            text: MenuButton::Confirm.label().to_string(),
        },
    ];

    let mut messages = 0;
    for event in events {
        let replies = shop.handle(event).await.unwrap();
        for outgoing in rendered(&replies) {
            assert!(!outgoing.text.is_empty());
            assert_payloads_valid(&outgoing);
            messages += 1;
        }
    }
    // welcome, catalog header + 1 card, description, prices, add,
    // cart header + group + total, contact prompt
    assert_eq!(messages, 10);
}

#[tokio::test]
async fn test_price_selection_shows_kilogram_pack() {
    let dir = TempDir::new().unwrap();
    let shop = shop(&dir);
    shop.handle(Event::Start(profile())).await.unwrap();

    let replies = shop
        .handle(Event::Callback {
            buyer_id: 100,
            data: "show_prices:1".to_string(),
        })
        .await
        .unwrap();

    let outgoing = &rendered(&replies)[0];
    let keyboard = outgoing.inline_keyboard().unwrap();
    let labels: Vec<&str> = keyboard
        .inline_keyboard
        .iter()
        .flatten()
        .map(|b| b.text.as_str())
        .collect();
    assert_eq!(labels, vec!["Назад", "250г - 210 грн", "1кг - 720 грн"]);
}

#[test]
fn test_schema_builds() {
    let dir = TempDir::new().unwrap();
    let _handler = schema(HandlerDeps::new(shop(&dir)));
}
