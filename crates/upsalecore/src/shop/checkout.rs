//! Checkout: order snapshot, the linear contact → city → branch gate and
//! validation of the values the buyer types in.

use chrono::NaiveDate;

use crate::core::config;
use crate::core::error::{InputField, ShopError, ShopResult};
use crate::core::types::{OrderStatus, Price};
use crate::shop::cart::CartLine;
use crate::shop::catalog::Buyer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub buyer_id: i64,
    pub status: OrderStatus,
    pub city: Option<String>,
    pub branch_number: Option<i64>,
    pub created: NaiveDate,
}

/// Where a buyer is in checkout. Computed from the buyer and the active
/// order; the first missing field wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    AwaitingContact,
    AwaitingCity,
    AwaitingBranch,
    Ready,
}

impl CheckoutState {
    pub fn resolve(buyer: &Buyer, order: &Order) -> Self {
        if !buyer.has_phone_number() {
            CheckoutState::AwaitingContact
        } else if order.city.as_deref().is_none_or(str::is_empty) {
            CheckoutState::AwaitingCity
        } else if order.branch_number.is_none() {
            CheckoutState::AwaitingBranch
        } else {
            CheckoutState::Ready
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CheckoutState::Ready)
    }
}

/// An order with everything the back-office needs to fulfil it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order: Order,
    pub buyer: Buyer,
    pub lines: Vec<CartLine>,
}

impl OrderSummary {
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }
}

/// Keeps digits and one leading '+'; rejects anything too short or too long
/// for the phone column.
pub fn normalize_phone(raw: &str) -> ShopResult<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    let allowed = trimmed
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0));

    if !allowed {
        return Err(ShopError::validation(
            InputField::PhoneNumber,
            format!("unexpected characters in {:?}", raw),
        ));
    }

    let phone = format!("+{}", digits);
    if digits.len() < config::checkout::PHONE_MIN_DIGITS || phone.len() > config::checkout::PHONE_MAX_LEN {
        return Err(ShopError::validation(
            InputField::PhoneNumber,
            format!("{} digits is not a phone number", digits.len()),
        ));
    }
    Ok(phone)
}

pub fn normalize_city(raw: &str) -> ShopResult<String> {
    let city = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let len = city.chars().count();
    if len == 0 {
        return Err(ShopError::validation(InputField::City, "city is empty"));
    }
    if len > config::checkout::CITY_MAX_LEN {
        return Err(ShopError::validation(
            InputField::City,
            format!("city is {} characters long", len),
        ));
    }
    Ok(city)
}

/// Branch numbers are positive integers; "№12" and "#12" are accepted.
pub fn parse_branch_number(raw: &str) -> ShopResult<i64> {
    let text = raw.trim();
    let text = text
        .strip_prefix('№')
        .or_else(|| text.strip_prefix('#'))
        .unwrap_or(text)
        .trim();

    match text.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(n) => Err(ShopError::validation(
            InputField::BranchNumber,
            format!("branch number must be positive, got {}", n),
        )),
        Err(_) => Err(ShopError::validation(
            InputField::BranchNumber,
            format!("{:?} is not a number", raw),
        )),
    }
}
