//! Inline button payloads.
//!
//! Wire format is `"<action>:<id>"` (e.g. `plus_one:17`), plus the bare
//! `clean_cart` and `noop` tokens. Telegram caps callback data at 64 bytes,
//! which this format stays well under.

use std::fmt;
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::core::error::{ShopError, ShopResult};

const CLEAN_CART: &str = "clean_cart";
const NOOP: &str = "noop";

/// Per-entity button actions. Product actions carry a product id, cart
/// actions carry a purchasable unit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Description,
    Product,
    ShowPrices,
    AddToCart,
    PlusOne,
    MinusOne,
    RemoveOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Entity { action: Action, id: i64 },
    CleanCart,
    /// Inert buttons (labels, "already in cart")
    Noop,
}

impl Callback {
    pub fn entity(action: Action, id: i64) -> Self {
        Callback::Entity { action, id }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(data: &str) -> ShopResult<Self> {
        data.parse()
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Entity { action, id } => write!(f, "{}:{}", action, id),
            Callback::CleanCart => f.write_str(CLEAN_CART),
            Callback::Noop => f.write_str(NOOP),
        }
    }
}

impl FromStr for Callback {
    type Err = ShopError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data {
            CLEAN_CART => return Ok(Callback::CleanCart),
            NOOP => return Ok(Callback::Noop),
            _ => {}
        }

        let (action, id) = data
            .split_once(':')
            .ok_or_else(|| ShopError::InvalidCallback(data.to_string()))?;
        let action = Action::from_str(action).map_err(|_| ShopError::InvalidCallback(data.to_string()))?;
        let id = id
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ShopError::InvalidCallback(data.to_string()))?;

        Ok(Callback::Entity { action, id })
    }
}
