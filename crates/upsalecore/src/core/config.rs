use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: upsale.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "upsale.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: upsale.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "upsale.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Custom Bot API server URL (local telegram-bot-api), if any
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok());

/// Currency label appended to every price shown to buyers
pub const CURRENCY: &str = "грн";

/// Cart limits
pub mod cart {
    use super::{env, Lazy};

    /// Floor for a single cart line; decrease never goes below it
    pub const MIN_QUANTITY: u32 = 1;

    /// Ceiling used when CART_MAX_QUANTITY is not set
    pub const DEFAULT_MAX_QUANTITY: u32 = 10;

    /// Maximum quantity of one unit in a cart
    /// Read from CART_MAX_QUANTITY environment variable, never below MIN_QUANTITY
    pub static MAX_QUANTITY: Lazy<u32> = Lazy::new(|| {
        env::var("CART_MAX_QUANTITY")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_QUANTITY)
            .max(MIN_QUANTITY)
    });
}

/// Checkout field limits (mirror the column sizes)
pub mod checkout {
    /// Longest accepted delivery city name, in characters
    pub const CITY_MAX_LEN: usize = 50;

    /// Longest stored phone number including the leading '+'
    pub const PHONE_MAX_LEN: usize = 15;

    /// Shortest phone number we accept, digits only
    pub const PHONE_MIN_DIGITS: usize = 7;
}

/// Catalog field limits (mirror the column sizes)
pub mod catalog {
    /// Longest pack unit label, in characters
    pub const PACK_UNIT_MAX_LEN: usize = 5;
}

/// Database configuration
pub mod db {
    use super::Duration;

    /// Maximum number of pooled SQLite connections
    pub const POOL_SIZE: u32 = 10;

    /// How long a connection waits on a locked database (in seconds)
    pub const BUSY_TIMEOUT_SECS: u64 = 5;

    /// Busy timeout duration
    pub fn busy_timeout() -> Duration {
        Duration::from_secs(BUSY_TIMEOUT_SECS)
    }
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Dispatcher retry delay duration
    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }

    /// Attempts at get_me() while the Bot API is still starting up
    pub const STARTUP_MAX_RETRIES: u32 = 12;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
