//! Rendering of shop views into Telegram messages and keyboards.
//!
//! Pure functions only; sending happens in [`crate::telegram::delivery`].

use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};
use upsalecore::core::config::CURRENCY;
use upsalecore::core::error::InputField;
use upsalecore::core::types::Price;
use upsalecore::shop::{Action, Callback, CartLine, CheckoutState, MenuButton, Notice, PriceOption, ProductListing, View};

pub const CLEAN_CART_BUTTON: &str = "🧹 Очистить корзину";
pub const SEND_CONTACT_BUTTON: &str = "Отправить номер";

/// A rendered message: text (or photo caption) plus an optional keyboard.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub text: String,
    /// Photo URL; the text becomes its caption
    pub photo: Option<String>,
    pub markup: Option<ReplyMarkup>,
}

impl Outgoing {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            photo: None,
            markup: None,
        }
    }

    fn with_markup(mut self, markup: impl Into<ReplyMarkup>) -> Self {
        self.markup = Some(markup.into());
        self
    }

    fn with_photo(mut self, url: &str) -> Self {
        self.photo = Some(url.to_string());
        self
    }

    /// Inline keyboard, the only kind an edited message can carry.
    pub fn inline_keyboard(&self) -> Option<InlineKeyboardMarkup> {
        match &self.markup {
            Some(ReplyMarkup::InlineKeyboard(keyboard)) => Some(keyboard.clone()),
            _ => None,
        }
    }
}

pub fn render(view: &View) -> Outgoing {
    match view {
        View::Welcome => welcome(),
        View::Catalog => Outgoing::text("Давай выберем что-то вкусненькое!")
            .with_markup(menu(&[&[MenuButton::Cart], &[MenuButton::Exit]])),
        View::ProductCard { listing, expanded } => product_card(listing, *expanded),
        View::PriceSelection { listing, options } => price_selection(listing, options),
        View::CartHeader => Outgoing::text(MenuButton::Cart.label()).with_markup(menu(&[
            &[MenuButton::Products, MenuButton::Confirm],
            &[MenuButton::Exit],
        ])),
        View::CartEmpty => Outgoing::text("В корзине пока пусто"),
        View::CartGroup { listing, lines } => cart_group(listing, lines),
        View::CartTotal { total } => Outgoing::text("Общая сумма заказа:").with_markup(total_keyboard(*total)),
        View::CartCleared => Outgoing::text("Корзина очищена"),
        View::Checkout(state) => checkout(*state),
        View::ContactSaved => Outgoing::text("Номер телефона сохранён 👌"),
        View::InvalidInput(field) => invalid_input(*field),
        View::StartRequired => Outgoing::text("Нажмите /start, чтобы начать"),
        View::Unrecognized => Outgoing::text("Не понимаю 🤔 Воспользуйтесь кнопками меню"),
        View::Failure => Outgoing::text("Что-то пошло не так, попробуйте ещё раз"),
    }
}

/// Text of the pop-up shown on a button press.
pub fn notice_text(notice: Notice) -> String {
    match notice {
        Notice::MaxQuantity(quantity) => format!("Больше {} шт. добавить нельзя", quantity),
        Notice::MinQuantity(quantity) => {
            format!("Меньше {} шт. быть не может. Чтобы убрать товар, нажмите ❌", quantity)
        }
        Notice::Unavailable => "Товар недоступен".to_string(),
    }
}

/// Inert total button plus the clean cart button.
pub fn total_keyboard(total: Price) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(format_price(total), Callback::Noop)],
        vec![button(CLEAN_CART_BUTTON, Callback::CleanCart)],
    ])
}

pub fn format_price(price: Price) -> String {
    format!("{} {}", price, CURRENCY)
}

fn welcome() -> Outgoing {
    Outgoing::text(format!(
        "Чтобы сделать новый заказ нажмите '{}'",
        MenuButton::Go.label()
    ))
    .with_markup(menu(&[&[MenuButton::Go]]))
}

fn menu(rows: &[&[MenuButton]]) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = rows
        .iter()
        .map(|row| row.iter().map(|b| KeyboardButton::new(b.label())).collect())
        .collect();
    KeyboardMarkup::new(rows).resize_keyboard()
}

fn button(text: impl Into<String>, callback: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, callback.encode())
}

fn short_caption(listing: &ProductListing) -> String {
    let price = listing
        .min_price()
        .map(format_price)
        .unwrap_or_else(|| "—".to_string());
    format!("☕️ {}\n💵 Цена: {}", listing.product.name, price)
}

fn product_card(listing: &ProductListing, expanded: bool) -> Outgoing {
    let id = listing.product.id;
    let (caption, toggle) = if expanded {
        (
            format!("{}\n\n{}", short_caption(listing), listing.product.description),
            button("Скрыть описание", Callback::entity(Action::Product, id)),
        )
    } else {
        (
            short_caption(listing),
            button("Описание товара", Callback::entity(Action::Description, id)),
        )
    };

    Outgoing::text(caption)
        .with_photo(&listing.product.image)
        .with_markup(InlineKeyboardMarkup::new(vec![
            vec![toggle],
            vec![button("Добавить в корзину", Callback::entity(Action::ShowPrices, id))],
        ]))
}

fn price_selection(listing: &ProductListing, options: &[PriceOption]) -> Outgoing {
    let mut rows = vec![vec![button("Назад", Callback::entity(Action::Product, listing.product.id))]];
    rows.extend(options.iter().map(|option| {
        let label = format!("{} - {}", option.label, format_price(option.price));
        if option.in_cart {
            vec![button(format!("{} - В корзине", label), Callback::Noop)]
        } else {
            vec![button(label, Callback::entity(Action::AddToCart, option.unit_id))]
        }
    }));

    Outgoing::text(short_caption(listing))
        .with_photo(&listing.product.image)
        .with_markup(InlineKeyboardMarkup::new(rows))
}

fn cart_group(listing: &ProductListing, lines: &[CartLine]) -> Outgoing {
    let rows = lines
        .iter()
        .map(|line| {
            let unit_id = line.unit.id;
            vec![
                button("➕", Callback::entity(Action::PlusOne, unit_id)),
                button(format!("{}/{}", line.quantity, line.unit.pack.label()), Callback::Noop),
                button("➖", Callback::entity(Action::MinusOne, unit_id)),
                button("❌", Callback::entity(Action::RemoveOne, unit_id)),
            ]
        })
        .collect::<Vec<_>>();

    Outgoing::text(short_caption(listing))
        .with_photo(&listing.product.image)
        .with_markup(InlineKeyboardMarkup::new(rows))
}

fn contact_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(SEND_CONTACT_BUTTON).request(ButtonRequest::Contact)
    ]])
    .resize_keyboard()
    .one_time_keyboard()
}

fn checkout(state: CheckoutState) -> Outgoing {
    match state {
        CheckoutState::AwaitingContact => {
            Outgoing::text("Ваш номер телефона нужен, чтобы мы могли отправить посылку новой почтой")
                .with_markup(contact_keyboard())
        }
        CheckoutState::AwaitingCity => {
            Outgoing::text("Укажите город доставки").with_markup(ReplyMarkup::kb_remove())
        }
        CheckoutState::AwaitingBranch => Outgoing::text("Укажите номер отделения Новой Почты"),
        CheckoutState::Ready => Outgoing::text(
            "Заказ успешно оформлен. Мы свяжемся с вами если нужно будет уточнить детали",
        )
        .with_markup(menu(&[&[MenuButton::Go]])),
    }
}

fn invalid_input(field: InputField) -> Outgoing {
    match field {
        InputField::PhoneNumber => Outgoing::text(format!(
            "Не получилось распознать номер телефона. Нажмите «{}»",
            SEND_CONTACT_BUTTON
        ))
        .with_markup(contact_keyboard()),
        InputField::City => {
            Outgoing::text("Название города должно быть не длиннее 50 символов. Укажите город доставки")
        }
        InputField::BranchNumber => {
            Outgoing::text("Номер отделения должен быть целым числом. Укажите номер отделения Новой Почты")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use teloxide::types::InlineKeyboardButtonKind;
    use upsalecore::shop::{Pack, Product, PurchasableUnit};

    fn listing() -> ProductListing {
        let unit = |id: i64, size: i64, price: i64| PurchasableUnit {
            id,
            product_id: 7,
            pack: Pack {
                id,
                unit: "г".to_string(),
                size,
            },
            price: Price::from_major(price),
        };
        ProductListing {
            product: Product {
                id: 7,
                name: "Kenya AA".to_string(),
                description: "Blackcurrant".to_string(),
                image: "https://example.com/kenya.jpg".to_string(),
            },
            units: vec![unit(1, 250, 180), unit(2, 1000, 600)],
        }
    }

    fn callbacks(outgoing: &Outgoing) -> Vec<Vec<String>> {
        outgoing
            .inline_keyboard()
            .unwrap()
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| match &b.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                        other => panic!("unexpected button {:?}", other),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_product_card_toggles_description() {
        let collapsed = render(&View::ProductCard {
            listing: listing(),
            expanded: false,
        });
        assert_eq!(collapsed.text, "☕️ Kenya AA\n💵 Цена: 180 грн");
        assert_eq!(collapsed.photo.as_deref(), Some("https://example.com/kenya.jpg"));
        assert_eq!(callbacks(&collapsed), vec![vec!["description:7"], vec!["show_prices:7"]]);

        let expanded = render(&View::ProductCard {
            listing: listing(),
            expanded: true,
        });
        assert!(expanded.text.ends_with("\n\nBlackcurrant"));
        assert_eq!(callbacks(&expanded), vec![vec!["product:7"], vec!["show_prices:7"]]);
    }

    #[test]
    fn test_price_selection_marks_units_in_cart() {
        let options = vec![
            PriceOption {
                unit_id: 1,
                label: "250г".to_string(),
                price: Price::from_major(180),
                in_cart: true,
            },
            PriceOption {
                unit_id: 2,
                label: "1000г".to_string(),
                price: Price::from_major(600),
                in_cart: false,
            },
        ];
        let outgoing = render(&View::PriceSelection {
            listing: listing(),
            options,
        });

        assert_eq!(
            callbacks(&outgoing),
            vec![vec!["product:7"], vec!["noop"], vec!["add_to_cart:2"]]
        );
        let keyboard = outgoing.inline_keyboard().unwrap();
        assert_eq!(keyboard.inline_keyboard[1][0].text, "250г - 180 грн - В корзине");
    }

    #[test]
    fn test_cart_group_row_controls() {
        let lines = vec![CartLine {
            unit: listing().units[0].clone(),
            quantity: 3,
        }];
        let outgoing = render(&View::CartGroup {
            listing: listing(),
            lines,
        });

        assert_eq!(
            callbacks(&outgoing),
            vec![vec!["plus_one:1", "noop", "minus_one:1", "remove_one:1"]]
        );
        assert_eq!(outgoing.inline_keyboard().unwrap().inline_keyboard[0][1].text, "3/250г");
    }

    #[test]
    fn test_total_keyboard() {
        let keyboard = total_keyboard(Price::from_minor(4550));
        assert_eq!(keyboard.inline_keyboard[0][0].text, "45.50 грн");
        assert_eq!(keyboard.inline_keyboard[1][0].text, CLEAN_CART_BUTTON);
    }

    #[test]
    fn test_contact_prompt_requests_contact() {
        let outgoing = render(&View::Checkout(CheckoutState::AwaitingContact));
        match outgoing.markup {
            Some(ReplyMarkup::Keyboard(keyboard)) => {
                assert_eq!(keyboard.keyboard[0][0].text, SEND_CONTACT_BUTTON);
                assert_eq!(keyboard.keyboard[0][0].request, Some(ButtonRequest::Contact));
            }
            other => panic!("unexpected markup {:?}", other),
        }
    }

    #[test]
    fn test_welcome_offers_go_button() {
        let outgoing = render(&View::Welcome);
        assert!(outgoing.text.contains(MenuButton::Go.label()));
        assert!(outgoing.photo.is_none());
    }
}
