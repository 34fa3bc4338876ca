use thiserror::Error;

use crate::core::types::OrderStatus;

/// Buyer-supplied fields that go through validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    PhoneNumber,
    City,
    BranchNumber,
}

/// Centralized error types for the shop
///
/// Domain variants (`NotFound`, `Validation`, `EmptyCart`, `DuplicateOrder`,
/// `InvalidCallback`) are turned into chat replies at the router boundary.
/// Storage variants fail the current event only.
#[derive(Error, Debug)]
pub enum ShopError {
    /// Referenced buyer/product/unit/order does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Buyer input failed validation
    #[error("Validation error ({field:?}): {message}")]
    Validation { field: InputField, message: String },

    /// Checkout attempted with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// A second `new` order was about to be created for the same buyer
    #[error("Buyer {0} already has an open order")]
    DuplicateOrder(i64),

    /// Button payload that does not decode to a known action
    #[error("Invalid callback payload: {0}")]
    InvalidCallback(String),

    /// Back-office tried to move an order anywhere but one step forward
    #[error("Order status cannot change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[cfg(feature = "telegram")]
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Anyhow errors (migrations, catalog import)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl ShopError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        ShopError::NotFound { entity, id }
    }

    pub fn validation(field: InputField, message: impl Into<String>) -> Self {
        ShopError::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for errors that describe the buyer's request rather than the
    /// infrastructure; these never abort an event.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            ShopError::NotFound { .. }
                | ShopError::Validation { .. }
                | ShopError::EmptyCart
                | ShopError::DuplicateOrder(_)
                | ShopError::InvalidCallback(_)
                | ShopError::InvalidTransition { .. }
        )
    }
}

/// Type alias for Result with ShopError
pub type ShopResult<T> = Result<T, ShopError>;
