//! Storefront domain: catalog, cart, checkout and the conversation router.

pub mod callback;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod locks;
pub mod router;
pub mod view;

pub use callback::{Action, Callback};
pub use cart::{AddOutcome, Cart, CartLine, CartPolicy, RemoveOutcome};
pub use catalog::{Buyer, BuyerProfile, Pack, Product, ProductListing, PurchasableUnit};
pub use checkout::{CheckoutState, Order, OrderSummary};
pub use locks::BuyerLocks;
pub use router::{Event, Shop};
pub use view::{MenuButton, Notice, PriceOption, Reply, View};
