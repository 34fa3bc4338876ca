//! Catalog and buyer records as the conversation sees them.

use crate::core::types::Price;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Image URL sent with every product card
    pub image: String,
}

/// Package size, e.g. 250 "г" or 1 "кг".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pack {
    pub id: i64,
    pub unit: String,
    pub size: i64,
}

impl Pack {
    /// Compact label used on buttons: "250г".
    pub fn label(&self) -> String {
        format!("{}{}", self.size, self.unit)
    }
}

/// A specific pack of a specific product with its price (a stock keeping unit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasableUnit {
    pub id: i64,
    pub product_id: i64,
    pub pack: Pack,
    pub price: Price,
}

/// A product together with every unit it is sold in, ordered by unit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub product: Product,
    pub units: Vec<PurchasableUnit>,
}

impl ProductListing {
    /// Cheapest unit price; `None` for a product with nothing to sell yet.
    pub fn min_price(&self) -> Option<Price> {
        self.units.iter().map(|u| u.price).min()
    }

    pub fn unit(&self, unit_id: i64) -> Option<&PurchasableUnit> {
        self.units.iter().find(|u| u.id == unit_id)
    }
}

/// Identity fields taken from the chat platform on `/start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_bot: bool,
}

impl BuyerProfile {
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    /// "@username" when there is one, otherwise the full name.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(username) => format!("@{}", username),
            None => self.full_name(),
        }
    }

    pub fn link(&self) -> Option<String> {
        self.username.as_deref().map(|u| format!("https://t.me/{}", u))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buyer {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub full_name: String,
    pub name: String,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub link: Option<String>,
    pub is_bot: bool,
    /// Captured from a contact card during checkout
    pub phone_number: Option<String>,
}

impl Buyer {
    pub fn has_phone_number(&self) -> bool {
        self.phone_number.as_deref().is_some_and(|p| !p.is_empty())
    }
}
