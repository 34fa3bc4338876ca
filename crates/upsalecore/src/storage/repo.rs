//! Repository seams between the shop service and persistence.

use crate::core::error::ShopResult;
use crate::core::types::OrderStatus;
use crate::shop::cart::{Cart, CartLine};
use crate::shop::catalog::{Buyer, BuyerProfile, ProductListing, PurchasableUnit};
use crate::shop::checkout::Order;

pub trait BuyerRepository {
    fn buyer(&self, buyer_id: i64) -> ShopResult<Option<Buyer>>;

    /// Inserts the buyer and their cart if missing. Existing buyers are left
    /// untouched. Returns the stored buyer and whether it was created.
    fn get_or_create_buyer(&self, profile: &BuyerProfile) -> ShopResult<(Buyer, bool)>;

    fn set_phone_number(&self, buyer_id: i64, phone_number: &str) -> ShopResult<()>;
}

pub trait CatalogRepository {
    /// Every product with its units, ordered by product id.
    fn listings(&self) -> ShopResult<Vec<ProductListing>>;

    fn listing(&self, product_id: i64) -> ShopResult<Option<ProductListing>>;

    fn unit(&self, unit_id: i64) -> ShopResult<Option<PurchasableUnit>>;
}

pub trait CartRepository {
    /// Fails with `NotFound` when the buyer has no cart.
    fn load_cart(&self, buyer_id: i64) -> ShopResult<Cart>;

    /// Stores `quantity` for the line, inserting it if needed.
    fn put_line(&self, buyer_id: i64, unit_id: i64, quantity: u32) -> ShopResult<()>;

    fn delete_line(&self, buyer_id: i64, unit_id: i64) -> ShopResult<()>;

    fn delete_all_lines(&self, buyer_id: i64) -> ShopResult<usize>;

    fn set_total_message(&self, buyer_id: i64, message_id: Option<i32>) -> ShopResult<()>;
}

pub trait OrderRepository {
    /// The buyer's order in `new` status, if any.
    fn active_order(&self, buyer_id: i64) -> ShopResult<Option<Order>>;

    /// Creates a `new` order and moves every cart line onto it, atomically.
    ///
    /// Fails with `EmptyCart` when there is nothing to move and with
    /// `DuplicateOrder` when a `new` order already exists; in both cases
    /// nothing is written.
    fn place_order(&self, buyer_id: i64) -> ShopResult<Order>;

    /// Moves whatever is left in the cart onto the buyer's `new` order,
    /// atomically. A unit already on the order has its quantity summed,
    /// capped at `max_quantity`. Returns how many cart lines were taken.
    ///
    /// Fails with `NotFound` when `order_id` is not the buyer's `new` order.
    fn merge_cart_into_order(&self, buyer_id: i64, order_id: i64, max_quantity: u32) -> ShopResult<usize>;

    fn order(&self, order_id: i64) -> ShopResult<Option<Order>>;

    fn order_lines(&self, order_id: i64) -> ShopResult<Vec<CartLine>>;

    /// Orders newest first, optionally filtered by status.
    fn orders(&self, status: Option<OrderStatus>) -> ShopResult<Vec<Order>>;

    fn set_city(&self, order_id: i64, city: &str) -> ShopResult<()>;

    fn set_branch_number(&self, order_id: i64, branch_number: i64) -> ShopResult<()>;

    fn set_status(&self, order_id: i64, status: OrderStatus) -> ShopResult<()>;
}

/// Everything the shop service needs from storage.
pub trait ShopStore: BuyerRepository + CatalogRepository + CartRepository + OrderRepository + Send + Sync {}

impl<T> ShopStore for T where T: BuyerRepository + CatalogRepository + CartRepository + OrderRepository + Send + Sync {}
