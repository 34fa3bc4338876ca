use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Money amount in minor currency units (kopiyky).
///
/// Prices live in the database as integers so totals never drift the way
/// float columns do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub const fn from_minor(minor: i64) -> Self {
        Price(minor)
    }

    pub const fn from_major(major: i64) -> Self {
        Price(major * 100)
    }

    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Line subtotal: price of one unit times quantity.
    pub fn times(self, quantity: u32) -> Price {
        Price(self.0 * i64::from(quantity))
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        iter.fold(Price::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    /// Whole amounts render without a fraction ("180"), others with two digits ("180.50").
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let (major, minor) = (abs / 100, abs % 100);
        if minor == 0 {
            write!(f, "{}{}", sign, major)
        } else {
            write!(f, "{}{}.{:02}", sign, major, minor)
        }
    }
}

impl FromStr for Price {
    type Err = String;

    /// Parses "180", "180.5", "180.50" or "180,50".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().replace(',', ".");
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s.as_str(), ""),
        };

        if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Invalid price: {}", s));
        }
        if minor.len() > 2 || !minor.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Invalid price: {}", s));
        }

        let major: i64 = major.parse().map_err(|_| format!("Invalid price: {}", s))?;
        let minor: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|_| format!("Invalid price: {}", s))? * 10,
            _ => minor.parse().map_err(|_| format!("Invalid price: {}", s))?,
        };

        major
            .checked_mul(100)
            .and_then(|m| m.checked_add(minor))
            .map(Price)
            .ok_or_else(|| format!("Price out of range: {}", s))
    }
}

impl rusqlite::types::FromSql for Price {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        value.as_i64().map(Price)
    }
}

impl rusqlite::types::ToSql for Price {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::from(self.0))
    }
}

/// Order lifecycle. The bot only ever creates `New` orders; the back-office
/// moves them forward one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    InProgress,
    Done,
}

impl OrderStatus {
    /// The only status this one may move to, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::New => Some(OrderStatus::InProgress),
            OrderStatus::InProgress => Some(OrderStatus::Done),
            OrderStatus::Done => None,
        }
    }

    pub fn can_advance_to(&self, to: OrderStatus) -> bool {
        self.next() == Some(to)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            OrderStatus::New => "🆕",
            OrderStatus::InProgress => "📦",
            OrderStatus::Done => "✅",
        }
    }
}

// rusqlite FromSql: read status from DB text column
impl rusqlite::types::FromSql for OrderStatus {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let s = value.as_str()?;
        OrderStatus::from_str(s).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
    }
}

// rusqlite ToSql: write status as text to DB
impl rusqlite::types::ToSql for OrderStatus {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::Borrowed(rusqlite::types::ValueRef::Text(
            self.as_ref().as_bytes(),
        )))
    }
}
