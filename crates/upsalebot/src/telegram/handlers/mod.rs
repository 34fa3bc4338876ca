//! Telegram update handlers
//!
//! Every branch turns an update into a shop [`upsalecore::Event`], lets the
//! router handle it and delivers the replies.

pub mod schema;
pub mod types;

pub use schema::schema;
pub use types::{profile_from_user, HandlerDeps, HandlerError};
