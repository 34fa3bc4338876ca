//! Cart aggregate: per-buyer lines with explicit quantities.
//!
//! All mutations are pure; the shop service persists the affected line
//! afterwards. At most one line exists per purchasable unit.

use crate::core::config;
use crate::core::error::{ShopError, ShopResult};
use crate::core::types::Price;
use crate::shop::catalog::PurchasableUnit;

/// Quantity bounds for one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartPolicy {
    pub min_quantity: u32,
    pub max_quantity: u32,
}

impl CartPolicy {
    pub fn new(min_quantity: u32, max_quantity: u32) -> Self {
        let min_quantity = min_quantity.max(1);
        Self {
            min_quantity,
            max_quantity: max_quantity.max(min_quantity),
        }
    }

    /// Bounds from CART_MAX_QUANTITY / the built-in floor.
    pub fn from_config() -> Self {
        Self::new(config::cart::MIN_QUANTITY, *config::cart::MAX_QUANTITY)
    }
}

impl Default for CartPolicy {
    fn default() -> Self {
        Self::new(config::cart::MIN_QUANTITY, config::cart::DEFAULT_MAX_QUANTITY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub unit: PurchasableUnit,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> Price {
        self.unit.price.times(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Incremented(u32),
    /// Already at the ceiling; nothing changed
    AtMaximum(u32),
}

impl AddOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, AddOutcome::AtMaximum(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Decremented(u32),
    /// Already at the floor; nothing changed
    AtMinimum(u32),
}

impl RemoveOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, RemoveOutcome::AtMinimum(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    buyer_id: i64,
    lines: Vec<CartLine>,
    total_message_id: Option<i32>,
}

impl Cart {
    pub fn new(buyer_id: i64) -> Self {
        Self {
            buyer_id,
            lines: Vec::new(),
            total_message_id: None,
        }
    }

    /// Rebuilds a cart from stored lines. Duplicate units are merged.
    pub fn from_lines(buyer_id: i64, lines: Vec<CartLine>, total_message_id: Option<i32>) -> Self {
        let mut cart = Self {
            buyer_id,
            lines: Vec::with_capacity(lines.len()),
            total_message_id,
        };
        for line in lines {
            match cart.line_mut(line.unit.id) {
                Some(existing) => existing.quantity += line.quantity,
                None => cart.lines.push(line),
            }
        }
        cart
    }

    pub fn buyer_id(&self) -> i64 {
        self.buyer_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Chat message that shows the running total, if one was sent.
    pub fn total_message_id(&self) -> Option<i32> {
        self.total_message_id
    }

    pub fn set_total_message_id(&mut self, message_id: Option<i32>) {
        self.total_message_id = message_id;
    }

    pub fn line(&self, unit_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.unit.id == unit_id)
    }

    fn line_mut(&mut self, unit_id: i64) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.unit.id == unit_id)
    }

    pub fn contains(&self, unit_id: i64) -> bool {
        self.line(unit_id).is_some()
    }

    pub fn quantity_of(&self, unit_id: i64) -> Option<u32> {
        self.line(unit_id).map(|l| l.quantity)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Puts one more of `unit` into the cart, never past `policy.max_quantity`.
    pub fn add_unit(&mut self, unit: &PurchasableUnit, policy: CartPolicy) -> AddOutcome {
        match self.line_mut(unit.id) {
            Some(line) if line.quantity >= policy.max_quantity => AddOutcome::AtMaximum(line.quantity),
            Some(line) => {
                line.quantity += 1;
                AddOutcome::Incremented(line.quantity)
            }
            None => {
                self.lines.push(CartLine {
                    unit: unit.clone(),
                    quantity: policy.min_quantity,
                });
                AddOutcome::Added
            }
        }
    }

    /// Takes one away, never below `policy.min_quantity`; removing a line
    /// entirely is [`Cart::clear_unit`].
    pub fn remove_one_unit(&mut self, unit_id: i64, policy: CartPolicy) -> ShopResult<RemoveOutcome> {
        let line = self
            .line_mut(unit_id)
            .ok_or_else(|| ShopError::not_found("cart line", unit_id))?;

        if line.quantity <= policy.min_quantity {
            return Ok(RemoveOutcome::AtMinimum(line.quantity));
        }
        line.quantity -= 1;
        Ok(RemoveOutcome::Decremented(line.quantity))
    }

    /// Drops the whole line regardless of quantity.
    pub fn clear_unit(&mut self, unit_id: i64) -> ShopResult<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|l| l.unit.id == unit_id)
            .ok_or_else(|| ShopError::not_found("cart line", unit_id))?;
        Ok(self.lines.remove(index))
    }

    /// Empties the cart, returning how many lines were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.lines.len();
        self.lines.clear();
        count
    }

    /// Lines of one product ordered by unit id.
    pub fn lines_for_product(&self, product_id: i64) -> Vec<CartLine> {
        let mut lines: Vec<CartLine> = self
            .lines
            .iter()
            .filter(|l| l.unit.product_id == product_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.unit.id);
        lines
    }

    /// Product ids in the order they first appear in the cart.
    pub fn product_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for line in &self.lines {
            if !ids.contains(&line.unit.product_id) {
                ids.push(line.unit.product_id);
            }
        }
        ids
    }
}
