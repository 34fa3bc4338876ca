//! Conversation router: turns one buyer event into a list of replies.
//!
//! Every event is handled while holding that buyer's lock, so the
//! read-modify-write of cart lines and the checkout gate never interleave
//! for the same buyer. Domain errors become replies here; only storage
//! failures reach the caller.

use std::sync::Arc;

use crate::core::error::{InputField, ShopError, ShopResult};
use crate::core::types::OrderStatus;
use crate::shop::callback::{Action, Callback};
use crate::shop::cart::{AddOutcome, Cart, CartPolicy, RemoveOutcome};
use crate::shop::catalog::{Buyer, BuyerProfile, ProductListing};
use crate::shop::checkout::{self, CheckoutState, Order, OrderSummary};
use crate::shop::locks::BuyerLocks;
use crate::shop::view::{MenuButton, Notice, PriceOption, Reply, View};
use crate::storage::repo::ShopStore;

/// Something the buyer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `/start` command
    Start(BuyerProfile),
    /// Plain text: a menu label or a checkout answer
    Text { profile: BuyerProfile, text: String },
    /// Shared contact card; `owner_id` is the user the card belongs to
    Contact {
        buyer_id: i64,
        phone_number: String,
        owner_id: Option<i64>,
    },
    /// Inline button press with its raw payload
    Callback { buyer_id: i64, data: String },
}

impl Event {
    pub fn buyer_id(&self) -> i64 {
        match self {
            Event::Start(profile) | Event::Text { profile, .. } => profile.id,
            Event::Contact { buyer_id, .. } | Event::Callback { buyer_id, .. } => *buyer_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Event::Start(_) => "start",
            Event::Text { .. } => "text",
            Event::Contact { .. } => "contact",
            Event::Callback { .. } => "callback",
        }
    }
}

pub struct Shop<S> {
    store: Arc<S>,
    locks: BuyerLocks,
    policy: CartPolicy,
}

impl<S: ShopStore> Shop<S> {
    pub fn new(store: Arc<S>, policy: CartPolicy) -> Self {
        Self {
            store,
            locks: BuyerLocks::new(),
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> CartPolicy {
        self.policy
    }

    /// Routes one event for its buyer.
    ///
    /// Returns `Err` only for storage failures; the caller is expected to log
    /// them and show a generic failure message.
    pub async fn handle(&self, event: Event) -> ShopResult<Vec<Reply>> {
        let buyer_id = event.buyer_id();
        let _guard = self.locks.acquire(buyer_id).await;
        log::info!("📨 {} event from buyer {}", event.kind(), buyer_id);

        match self.route(event) {
            Ok(replies) => Ok(replies),
            Err(e) => recover(buyer_id, e),
        }
    }

    fn route(&self, event: Event) -> ShopResult<Vec<Reply>> {
        match event {
            Event::Start(profile) => self.start(&profile),
            Event::Text { profile, text } => match MenuButton::from_label(&text) {
                Some(button) => self.menu(&profile, button),
                None => self.free_text(profile.id, &text),
            },
            Event::Contact {
                buyer_id,
                phone_number,
                owner_id,
            } => {
                if owner_id.is_some_and(|owner| owner != buyer_id) {
                    return Err(ShopError::validation(
                        InputField::PhoneNumber,
                        "contact card belongs to someone else",
                    ));
                }
                self.capture_contact(buyer_id, &phone_number)
            }
            Event::Callback { buyer_id, data } => self.callback(buyer_id, Callback::parse(&data)?),
        }
    }

    fn menu(&self, profile: &BuyerProfile, button: MenuButton) -> ShopResult<Vec<Reply>> {
        match button {
            MenuButton::Go | MenuButton::Products => self.catalog(),
            MenuButton::Cart => self.cart(profile.id),
            MenuButton::Confirm => self.confirm(profile.id),
            MenuButton::Exit => self.start(profile),
        }
    }

    fn callback(&self, buyer_id: i64, callback: Callback) -> ShopResult<Vec<Reply>> {
        let (action, id) = match callback {
            Callback::Noop => return Ok(Vec::new()),
            Callback::CleanCart => return self.clear_cart(buyer_id),
            Callback::Entity { action, id } => (action, id),
        };

        match action {
            Action::Description => Ok(vec![Reply::EditCurrent(View::ProductCard {
                listing: self.listing(id)?,
                expanded: true,
            })]),
            Action::Product => Ok(vec![Reply::EditCurrent(View::ProductCard {
                listing: self.listing(id)?,
                expanded: false,
            })]),
            Action::ShowPrices => {
                let listing = self.listing(id)?;
                let cart = self.store.load_cart(buyer_id)?;
                Ok(vec![Reply::EditCurrent(price_selection(listing, &cart))])
            }
            Action::AddToCart => self.add_unit(buyer_id, id),
            Action::PlusOne => self.plus_one(buyer_id, id),
            Action::MinusOne => self.remove_one_unit(buyer_id, id),
            Action::RemoveOne => self.clear_unit(buyer_id, id),
        }
    }

    /// Registers the buyer (and their cart) on first contact and greets them.
    pub fn start(&self, profile: &BuyerProfile) -> ShopResult<Vec<Reply>> {
        let (buyer, created) = self.store.get_or_create_buyer(profile)?;
        if created {
            log::info!("👤 New buyer {} ({})", buyer.id, buyer.name);
        }
        Ok(vec![Reply::Send(View::Welcome)])
    }

    /// Header followed by one collapsed card per product.
    pub fn catalog(&self) -> ShopResult<Vec<Reply>> {
        let mut replies = vec![Reply::Send(View::Catalog)];
        replies.extend(
            self.store
                .listings()?
                .into_iter()
                .map(|listing| Reply::Send(View::ProductCard { listing, expanded: false })),
        );
        Ok(replies)
    }

    pub fn listing(&self, product_id: i64) -> ShopResult<ProductListing> {
        self.store
            .listing(product_id)?
            .ok_or_else(|| ShopError::not_found("product", product_id))
    }

    /// Cart header, one card per product and the running total.
    pub fn cart(&self, buyer_id: i64) -> ShopResult<Vec<Reply>> {
        let cart = self.store.load_cart(buyer_id)?;
        if cart.is_empty() {
            return Ok(vec![Reply::Send(View::CartEmpty)]);
        }

        let mut replies = vec![Reply::Send(View::CartHeader)];
        for product_id in cart.product_ids() {
            let listing = self.listing(product_id)?;
            replies.push(Reply::Send(View::CartGroup {
                listing,
                lines: cart.lines_for_product(product_id),
            }));
        }
        replies.push(Reply::Send(View::CartTotal {
            total: cart.total_price(),
        }));
        Ok(replies)
    }

    /// Puts a unit into the cart from the price selection card. A unit that
    /// is already there is left as is; its button is inert.
    pub fn add_unit(&self, buyer_id: i64, unit_id: i64) -> ShopResult<Vec<Reply>> {
        let unit = self
            .store
            .unit(unit_id)?
            .ok_or_else(|| ShopError::not_found("unit", unit_id))?;
        let mut cart = self.store.load_cart(buyer_id)?;

        let mut replies = Vec::new();
        if !cart.contains(unit_id) {
            cart.add_unit(&unit, self.policy);
            self.persist_line(&cart, unit_id)?;
            replies.extend(refresh_total(&cart));
        }

        let listing = self.listing(unit.product_id)?;
        replies.insert(0, Reply::EditCurrent(price_selection(listing, &cart)));
        Ok(replies)
    }

    fn plus_one(&self, buyer_id: i64, unit_id: i64) -> ShopResult<Vec<Reply>> {
        let mut cart = self.store.load_cart(buyer_id)?;
        let unit = cart
            .line(unit_id)
            .map(|line| line.unit.clone())
            .ok_or_else(|| ShopError::not_found("cart line", unit_id))?;

        match cart.add_unit(&unit, self.policy) {
            AddOutcome::AtMaximum(quantity) => Ok(vec![Reply::Toast(Notice::MaxQuantity(quantity))]),
            AddOutcome::Added | AddOutcome::Incremented(_) => {
                self.persist_line(&cart, unit_id)?;
                self.group_changed(&cart, unit.product_id)
            }
        }
    }

    /// Takes one unit away, stopping at the floor.
    pub fn remove_one_unit(&self, buyer_id: i64, unit_id: i64) -> ShopResult<Vec<Reply>> {
        let mut cart = self.store.load_cart(buyer_id)?;
        match cart.remove_one_unit(unit_id, self.policy)? {
            RemoveOutcome::AtMinimum(quantity) => Ok(vec![Reply::Toast(Notice::MinQuantity(quantity))]),
            RemoveOutcome::Decremented(_) => {
                self.persist_line(&cart, unit_id)?;
                let product_id = cart
                    .line(unit_id)
                    .map(|line| line.unit.product_id)
                    .ok_or_else(|| ShopError::not_found("cart line", unit_id))?;
                self.group_changed(&cart, product_id)
            }
        }
    }

    /// Drops the whole line. The product card disappears with its last line.
    pub fn clear_unit(&self, buyer_id: i64, unit_id: i64) -> ShopResult<Vec<Reply>> {
        let mut cart = self.store.load_cart(buyer_id)?;
        let removed = cart.clear_unit(unit_id)?;
        self.store.delete_line(buyer_id, unit_id)?;
        self.group_changed(&cart, removed.unit.product_id)
    }

    pub fn clear_cart(&self, buyer_id: i64) -> ShopResult<Vec<Reply>> {
        let removed = self.store.delete_all_lines(buyer_id)?;
        self.store.set_total_message(buyer_id, None)?;
        log::info!("🧹 Buyer {} cleared {} cart line(s)", buyer_id, removed);
        Ok(vec![Reply::Send(View::CartCleared), Reply::Send(View::Welcome)])
    }

    /// Turns the cart into an order and shows the next checkout step.
    ///
    /// While the buyer has an order in `new` status, anything added to the
    /// cart since joins that order; a second order is never created.
    pub fn confirm(&self, buyer_id: i64) -> ShopResult<Vec<Reply>> {
        let buyer = self.buyer(buyer_id)?;
        let order = match self.store.active_order(buyer_id)? {
            Some(order) => {
                self.store
                    .merge_cart_into_order(buyer_id, order.id, self.policy.max_quantity)?;
                order
            }
            None => self.store.place_order(buyer_id)?,
        };
        Ok(vec![Reply::Send(View::Checkout(CheckoutState::resolve(&buyer, &order)))])
    }

    pub fn capture_contact(&self, buyer_id: i64, raw_phone: &str) -> ShopResult<Vec<Reply>> {
        let phone_number = checkout::normalize_phone(raw_phone)?;
        self.store.set_phone_number(buyer_id, &phone_number)?;
        log::info!("📞 Buyer {} shared a phone number", buyer_id);

        match self.checkout_state(buyer_id)? {
            Some(state) => Ok(vec![Reply::Send(View::Checkout(state))]),
            None => Ok(vec![Reply::Send(View::ContactSaved)]),
        }
    }

    pub fn capture_city(&self, buyer_id: i64, raw_city: &str) -> ShopResult<Vec<Reply>> {
        let city = checkout::normalize_city(raw_city)?;
        let order = self.require_active_order(buyer_id)?;
        self.store.set_city(order.id, &city)?;
        self.checkout_reply(buyer_id)
    }

    pub fn capture_branch(&self, buyer_id: i64, raw_branch: &str) -> ShopResult<Vec<Reply>> {
        let branch_number = checkout::parse_branch_number(raw_branch)?;
        let order = self.require_active_order(buyer_id)?;
        self.store.set_branch_number(order.id, branch_number)?;
        self.checkout_reply(buyer_id)
    }

    /// Where the buyer is in checkout; `None` without an order in `new` status.
    pub fn checkout_state(&self, buyer_id: i64) -> ShopResult<Option<CheckoutState>> {
        let buyer = self.buyer(buyer_id)?;
        Ok(self
            .store
            .active_order(buyer_id)?
            .map(|order| CheckoutState::resolve(&buyer, &order)))
    }

    /// Remembers which chat message shows the cart total so later edits can
    /// refresh it.
    ///
    /// Runs under the buyer lock. A press handled between sending the total
    /// and this call refreshes the previous total message (or none); the
    /// new one is current from the next press on.
    pub async fn remember_total_message(&self, buyer_id: i64, message_id: i32) -> ShopResult<()> {
        let _guard = self.locks.acquire(buyer_id).await;
        self.store.set_total_message(buyer_id, Some(message_id))
    }

    /// Back-office: moves an order exactly one step forward.
    pub fn set_order_status(&self, order_id: i64, status: OrderStatus) -> ShopResult<Order> {
        let mut order = self
            .store
            .order(order_id)?
            .ok_or_else(|| ShopError::not_found("order", order_id))?;

        if !order.status.can_advance_to(status) {
            return Err(ShopError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }
        self.store.set_status(order_id, status)?;
        log::info!("{} Order {}: {} → {}", status.emoji(), order_id, order.status, status);

        order.status = status;
        Ok(order)
    }

    /// Back-office: orders with buyer and lines, newest first.
    pub fn order_summaries(&self, status: Option<OrderStatus>) -> ShopResult<Vec<OrderSummary>> {
        self.store
            .orders(status)?
            .into_iter()
            .map(|order| {
                let buyer = self.buyer(order.buyer_id)?;
                let lines = self.store.order_lines(order.id)?;
                Ok(OrderSummary { order, buyer, lines })
            })
            .collect()
    }

    fn free_text(&self, buyer_id: i64, text: &str) -> ShopResult<Vec<Reply>> {
        // Unknown commands are never checkout answers
        if is_command(text) {
            log::info!("Buyer {} sent unknown command {:?}", buyer_id, text);
            return Ok(vec![Reply::Send(View::Unrecognized)]);
        }
        match self.checkout_state(buyer_id)? {
            Some(CheckoutState::AwaitingContact) => Ok(vec![Reply::Send(View::Checkout(CheckoutState::AwaitingContact))]),
            Some(CheckoutState::AwaitingCity) => self.capture_city(buyer_id, text),
            Some(CheckoutState::AwaitingBranch) => self.capture_branch(buyer_id, text),
            Some(CheckoutState::Ready) | None => Ok(vec![Reply::Send(View::Unrecognized)]),
        }
    }

    fn checkout_reply(&self, buyer_id: i64) -> ShopResult<Vec<Reply>> {
        let state = self
            .checkout_state(buyer_id)?
            .ok_or_else(|| ShopError::not_found("order", buyer_id))?;
        if state.is_ready() {
            log::info!("✅ Buyer {} completed checkout", buyer_id);
        }
        Ok(vec![Reply::Send(View::Checkout(state))])
    }

    fn buyer(&self, buyer_id: i64) -> ShopResult<Buyer> {
        self.store
            .buyer(buyer_id)?
            .ok_or_else(|| ShopError::not_found("buyer", buyer_id))
    }

    fn require_active_order(&self, buyer_id: i64) -> ShopResult<Order> {
        self.store
            .active_order(buyer_id)?
            .ok_or_else(|| ShopError::not_found("order", buyer_id))
    }

    fn persist_line(&self, cart: &Cart, unit_id: i64) -> ShopResult<()> {
        let quantity = cart
            .quantity_of(unit_id)
            .ok_or_else(|| ShopError::not_found("cart line", unit_id))?;
        self.store.put_line(cart.buyer_id(), unit_id, quantity)
    }

    /// Re-renders the product card a line belongs to and the running total.
    fn group_changed(&self, cart: &Cart, product_id: i64) -> ShopResult<Vec<Reply>> {
        let lines = cart.lines_for_product(product_id);
        let mut replies = if lines.is_empty() {
            vec![Reply::DeleteCurrent]
        } else {
            vec![Reply::EditCurrent(View::CartGroup {
                listing: self.listing(product_id)?,
                lines,
            })]
        };
        replies.extend(refresh_total(cart));
        Ok(replies)
    }
}

/// Text that reads as a bot command ("/help", "/start@shop_bot").
pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

fn price_selection(listing: ProductListing, cart: &Cart) -> View {
    let options = listing
        .units
        .iter()
        .map(|unit| PriceOption {
            unit_id: unit.id,
            label: unit.pack.label(),
            price: unit.price,
            in_cart: cart.contains(unit.id),
        })
        .collect();
    View::PriceSelection { listing, options }
}

fn refresh_total(cart: &Cart) -> Option<Reply> {
    cart.total_message_id().map(|message_id| Reply::RefreshTotal {
        message_id,
        total: cart.total_price(),
    })
}

/// Maps domain errors to replies; storage errors pass through.
fn recover(buyer_id: i64, err: ShopError) -> ShopResult<Vec<Reply>> {
    match err {
        ShopError::NotFound { entity: "buyer" | "cart", .. } => {
            log::warn!("Buyer {} has not started the bot yet", buyer_id);
            Ok(vec![Reply::Send(View::StartRequired)])
        }
        ShopError::NotFound { entity, id } => {
            log::warn!("Buyer {} referenced missing {} {}", buyer_id, entity, id);
            Ok(vec![Reply::Toast(Notice::Unavailable)])
        }
        ShopError::Validation { field, message } => {
            log::info!("Buyer {} sent invalid {:?}: {}", buyer_id, field, message);
            Ok(vec![Reply::Send(View::InvalidInput(field))])
        }
        ShopError::EmptyCart => Ok(vec![Reply::Send(View::CartEmpty)]),
        e @ (ShopError::DuplicateOrder(_) | ShopError::InvalidCallback(_) | ShopError::InvalidTransition { .. }) => {
            log::warn!("Ignoring event from buyer {}: {}", buyer_id, e);
            Ok(Vec::new())
        }
        e => {
            log::error!("❌ Event from buyer {} failed: {}", buyer_id, e);
            Err(e)
        }
    }
}
