//! What the router asks the transport to show.
//!
//! Views are plain data; turning them into captions and keyboards is the
//! transport's job.

use crate::core::error::InputField;
use crate::core::types::Price;
use crate::shop::cart::CartLine;
use crate::shop::catalog::ProductListing;
use crate::shop::checkout::CheckoutState;

/// Reply-keyboard buttons. Their labels arrive back as plain text messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    Go,
    Products,
    Cart,
    Confirm,
    Exit,
}

impl MenuButton {
    pub const ALL: [MenuButton; 5] = [
        MenuButton::Go,
        MenuButton::Products,
        MenuButton::Cart,
        MenuButton::Confirm,
        MenuButton::Exit,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            MenuButton::Go => "Go 🚀",
            MenuButton::Products => "☕️ Товары",
            MenuButton::Cart => "🛒 Корзина",
            MenuButton::Confirm => "✅ Подтвердить",
            MenuButton::Exit => "🚪 Выйты",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|b| b.label() == text)
    }
}

/// One purchasable option on the price selection card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceOption {
    pub unit_id: i64,
    pub label: String,
    pub price: Price,
    pub in_cart: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Welcome,
    /// Header sent before the product cards
    Catalog,
    ProductCard {
        listing: ProductListing,
        expanded: bool,
    },
    PriceSelection {
        listing: ProductListing,
        options: Vec<PriceOption>,
    },
    CartHeader,
    CartEmpty,
    /// All lines of one product, with per-line controls
    CartGroup {
        listing: ProductListing,
        lines: Vec<CartLine>,
    },
    CartTotal {
        total: Price,
    },
    CartCleared,
    Checkout(CheckoutState),
    ContactSaved,
    InvalidInput(InputField),
    StartRequired,
    Unrecognized,
    Failure,
}

/// Short pop-up answers to button presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    MaxQuantity(u32),
    MinQuantity(u32),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// New message in the chat
    Send(View),
    /// Replace the message whose button was pressed
    EditCurrent(View),
    /// Update the keyboard of the running-total message sent earlier
    RefreshTotal { message_id: i32, total: Price },
    /// Remove the message whose button was pressed
    DeleteCurrent,
    Toast(Notice),
}
