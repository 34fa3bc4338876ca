//! upsale - Telegram storefront bot
//!
//! Buyers browse products, fill a cart and confirm delivery details in a
//! private chat. The shop logic lives in `upsalecore`; this crate wires it
//! to Telegram and exposes the back-office CLI.

pub mod backoffice;
pub mod cli;
pub mod telegram;
