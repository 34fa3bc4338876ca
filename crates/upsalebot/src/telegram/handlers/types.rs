//! Handler types, dependencies, and buyer identity helpers

use std::sync::Arc;

use teloxide::types::User;
use upsalecore::shop::BuyerProfile;
use upsalecore::{Shop, SqliteStore};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub shop: Arc<Shop<SqliteStore>>,
}

impl HandlerDeps {
    pub fn new(shop: Arc<Shop<SqliteStore>>) -> Self {
        Self { shop }
    }
}

/// Telegram user id as stored in the buyers table.
pub fn buyer_id(user: &User) -> Option<i64> {
    i64::try_from(user.id.0).ok()
}

/// Buyer identity fields taken from the Telegram user.
pub fn profile_from_user(user: &User) -> Option<BuyerProfile> {
    Some(BuyerProfile {
        id: buyer_id(user)?,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
        is_bot: user.is_bot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "is_bot": false,
            "first_name": "Olena",
            "username": "olena",
            "language_code": "uk"
        }))
        .unwrap()
    }

    #[test]
    fn test_profile_from_user() {
        let profile = profile_from_user(&user()).unwrap();
        assert_eq!(profile.id, 42);
        assert_eq!(profile.display_name(), "@olena");
        assert_eq!(profile.link().as_deref(), Some("https://t.me/olena"));
    }
}
