//! SQLite implementation of the repositories.

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use crate::core::error::{ShopError, ShopResult};
use crate::core::types::OrderStatus;
use crate::shop::cart::{Cart, CartLine};
use crate::shop::catalog::{Buyer, BuyerProfile, Pack, Product, ProductListing, PurchasableUnit};
use crate::shop::checkout::Order;
use crate::storage::db::{create_pool, get_connection, DbConnection, DbPool};
use crate::storage::migrations::run_migrations;
use crate::storage::repo::{BuyerRepository, CartRepository, CatalogRepository, OrderRepository};

const BUYER_COLUMNS: &str =
    "id, first_name, last_name, full_name, name, username, language_code, link, is_bot, phone_number";

const ORDER_COLUMNS: &str = "id, buyer_id, status, city, branch_number, created";

/// Purchasable unit columns, in the order `unit_from_row` reads them.
const UNIT_SELECT: &str = "SELECT s.id, s.product_id, s.price, pk.id, pk.unit, pk.size
     FROM stock_keeping_units s
     JOIN packs pk ON pk.id = s.pack_id";

/// Cart/order line query prefix: quantity followed by the unit columns.
const LINE_SELECT: &str = "SELECT s.id, s.product_id, s.price, pk.id, pk.unit, pk.size, ci.quantity
     FROM cart_items ci
     JOIN stock_keeping_units s ON s.id = ci.sku_id
     JOIN packs pk ON pk.id = s.pack_id";

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Opens (or creates) the database file and brings the schema up to date.
    pub fn open(database_path: &str) -> ShopResult<Self> {
        let pool = create_pool(database_path)?;
        {
            let mut conn = get_connection(&pool)?;
            run_migrations(&mut conn)?;
        }
        log::info!("Database ready at {}", database_path);
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub(crate) fn conn(&self) -> ShopResult<DbConnection> {
        Ok(get_connection(&self.pool)?)
    }
}

fn buyer_from_row(row: &Row<'_>) -> rusqlite::Result<Buyer> {
    Ok(Buyer {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        full_name: row.get(3)?,
        name: row.get(4)?,
        username: row.get(5)?,
        language_code: row.get(6)?,
        link: row.get(7)?,
        is_bot: row.get(8)?,
        phone_number: row.get(9)?,
    })
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        buyer_id: row.get(1)?,
        status: row.get(2)?,
        city: row.get(3)?,
        branch_number: row.get(4)?,
        created: row.get(5)?,
    })
}

fn unit_from_row(row: &Row<'_>) -> rusqlite::Result<PurchasableUnit> {
    Ok(PurchasableUnit {
        id: row.get(0)?,
        product_id: row.get(1)?,
        price: row.get(2)?,
        pack: Pack {
            id: row.get(3)?,
            unit: row.get(4)?,
            size: row.get(5)?,
        },
    })
}

fn line_from_row(row: &Row<'_>) -> rusqlite::Result<CartLine> {
    Ok(CartLine {
        unit: unit_from_row(row)?,
        quantity: row.get(6)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        image: row.get(3)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl BuyerRepository for SqliteStore {
    fn buyer(&self, buyer_id: i64) -> ShopResult<Option<Buyer>> {
        let conn = self.conn()?;
        let buyer = conn
            .query_row(
                &format!("SELECT {} FROM buyers WHERE id = ?1", BUYER_COLUMNS),
                [buyer_id],
                buyer_from_row,
            )
            .optional()?;
        Ok(buyer)
    }

    fn get_or_create_buyer(&self, profile: &BuyerProfile) -> ShopResult<(Buyer, bool)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO buyers
                (id, first_name, last_name, full_name, name, username, language_code, link, is_bot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                profile.id,
                profile.first_name,
                profile.last_name,
                profile.full_name(),
                profile.display_name(),
                profile.username,
                profile.language_code,
                profile.link(),
                profile.is_bot,
            ],
        )?;
        tx.execute("INSERT OR IGNORE INTO carts (buyer_id) VALUES (?1)", [profile.id])?;

        let buyer = tx.query_row(
            &format!("SELECT {} FROM buyers WHERE id = ?1", BUYER_COLUMNS),
            [profile.id],
            buyer_from_row,
        )?;
        tx.commit()?;

        Ok((buyer, inserted > 0))
    }

    fn set_phone_number(&self, buyer_id: i64, phone_number: &str) -> ShopResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE buyers SET phone_number = ?1 WHERE id = ?2",
            params![phone_number, buyer_id],
        )?;
        if updated == 0 {
            return Err(ShopError::not_found("buyer", buyer_id));
        }
        Ok(())
    }
}

impl CatalogRepository for SqliteStore {
    fn listings(&self) -> ShopResult<Vec<ProductListing>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT id, name, description, image FROM products ORDER BY id")?;
        let mut listings: BTreeMap<i64, ProductListing> = BTreeMap::new();
        for product in stmt.query_map([], product_from_row)? {
            let product = product?;
            listings.insert(
                product.id,
                ProductListing {
                    product,
                    units: Vec::new(),
                },
            );
        }

        let mut stmt = conn.prepare(&format!("{} ORDER BY s.product_id, s.id", UNIT_SELECT))?;
        for unit in stmt.query_map([], unit_from_row)? {
            let unit = unit?;
            if let Some(listing) = listings.get_mut(&unit.product_id) {
                listing.units.push(unit);
            }
        }

        Ok(listings.into_values().collect())
    }

    fn listing(&self, product_id: i64) -> ShopResult<Option<ProductListing>> {
        let conn = self.conn()?;

        let product = conn
            .query_row(
                "SELECT id, name, description, image FROM products WHERE id = ?1",
                [product_id],
                product_from_row,
            )
            .optional()?;
        let Some(product) = product else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(&format!("{} WHERE s.product_id = ?1 ORDER BY s.id", UNIT_SELECT))?;
        let units = stmt
            .query_map([product_id], unit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(ProductListing { product, units }))
    }

    fn unit(&self, unit_id: i64) -> ShopResult<Option<PurchasableUnit>> {
        let conn = self.conn()?;
        let unit = conn
            .query_row(&format!("{} WHERE s.id = ?1", UNIT_SELECT), [unit_id], unit_from_row)
            .optional()?;
        Ok(unit)
    }
}

impl CartRepository for SqliteStore {
    fn load_cart(&self, buyer_id: i64) -> ShopResult<Cart> {
        let conn = self.conn()?;

        let total_message_id: Option<i32> = conn
            .query_row(
                "SELECT total_message_id FROM carts WHERE buyer_id = ?1",
                [buyer_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| ShopError::not_found("cart", buyer_id))?;

        let mut stmt = conn.prepare(&format!("{} WHERE ci.cart_id = ?1 ORDER BY ci.id", LINE_SELECT))?;
        let lines = stmt
            .query_map([buyer_id], line_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Cart::from_lines(buyer_id, lines, total_message_id))
    }

    fn put_line(&self, buyer_id: i64, unit_id: i64, quantity: u32) -> ShopResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE cart_items SET quantity = ?3 WHERE cart_id = ?1 AND sku_id = ?2",
            params![buyer_id, unit_id, quantity],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO cart_items (cart_id, sku_id, quantity) VALUES (?1, ?2, ?3)",
                params![buyer_id, unit_id, quantity],
            )?;
        }
        Ok(())
    }

    fn delete_line(&self, buyer_id: i64, unit_id: i64) -> ShopResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM cart_items WHERE cart_id = ?1 AND sku_id = ?2",
            params![buyer_id, unit_id],
        )?;
        if deleted == 0 {
            return Err(ShopError::not_found("cart line", unit_id));
        }
        Ok(())
    }

    fn delete_all_lines(&self, buyer_id: i64) -> ShopResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM cart_items WHERE cart_id = ?1", [buyer_id])?)
    }

    fn set_total_message(&self, buyer_id: i64, message_id: Option<i32>) -> ShopResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE carts SET total_message_id = ?1 WHERE buyer_id = ?2",
            params![message_id, buyer_id],
        )?;
        if updated == 0 {
            return Err(ShopError::not_found("cart", buyer_id));
        }
        Ok(())
    }
}

impl OrderRepository for SqliteStore {
    fn active_order(&self, buyer_id: i64) -> ShopResult<Option<Order>> {
        let conn = self.conn()?;
        let order = conn
            .query_row(
                &format!(
                    "SELECT {} FROM orders WHERE buyer_id = ?1 AND status = ?2",
                    ORDER_COLUMNS
                ),
                params![buyer_id, OrderStatus::New],
                order_from_row,
            )
            .optional()?;
        Ok(order)
    }

    fn place_order(&self, buyer_id: i64) -> ShopResult<Order> {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front so two checkouts cannot
        // both pass the existence check.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM orders WHERE buyer_id = ?1 AND status = ?2",
                params![buyer_id, OrderStatus::New],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(ShopError::DuplicateOrder(buyer_id));
        }

        let line_count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM cart_items WHERE cart_id = ?1",
            [buyer_id],
            |row| row.get(0),
        )?;
        if line_count == 0 {
            return Err(ShopError::EmptyCart);
        }

        if let Err(e) = tx.execute(
            "INSERT INTO orders (buyer_id, status) VALUES (?1, ?2)",
            params![buyer_id, OrderStatus::New],
        ) {
            return Err(if is_constraint_violation(&e) {
                ShopError::DuplicateOrder(buyer_id)
            } else {
                e.into()
            });
        }
        let order_id = tx.last_insert_rowid();

        let moved = tx.execute(
            "UPDATE cart_items SET order_id = ?1, cart_id = NULL WHERE cart_id = ?2",
            params![order_id, buyer_id],
        )?;
        // The running total belongs to the cart that was just emptied
        tx.execute("UPDATE carts SET total_message_id = NULL WHERE buyer_id = ?1", [buyer_id])?;

        let order = tx.query_row(
            &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS),
            [order_id],
            order_from_row,
        )?;
        tx.commit()?;

        log::info!(
            "Order {} created for buyer {} with {} line(s)",
            order_id,
            buyer_id,
            moved
        );
        Ok(order)
    }

    fn merge_cart_into_order(&self, buyer_id: i64, order_id: i64, max_quantity: u32) -> ShopResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let open: Option<i64> = tx
            .query_row(
                "SELECT id FROM orders WHERE id = ?1 AND buyer_id = ?2 AND status = ?3",
                params![order_id, buyer_id, OrderStatus::New],
                |row| row.get(0),
            )
            .optional()?;
        if open.is_none() {
            return Err(ShopError::not_found("order", order_id));
        }

        // Units already on the order: add the cart quantity to the order line
        let summed = tx.execute(
            "UPDATE cart_items
             SET quantity = MIN(quantity + (
                 SELECT c.quantity FROM cart_items c WHERE c.cart_id = ?1 AND c.sku_id = cart_items.sku_id
             ), ?3)
             WHERE order_id = ?2 AND sku_id IN (SELECT sku_id FROM cart_items WHERE cart_id = ?1)",
            params![buyer_id, order_id, max_quantity],
        )?;
        tx.execute(
            "DELETE FROM cart_items
             WHERE cart_id = ?1 AND sku_id IN (SELECT sku_id FROM cart_items WHERE order_id = ?2)",
            params![buyer_id, order_id],
        )?;

        let moved = tx.execute(
            "UPDATE cart_items SET order_id = ?1, cart_id = NULL WHERE cart_id = ?2",
            params![order_id, buyer_id],
        )?;
        tx.execute("UPDATE carts SET total_message_id = NULL WHERE buyer_id = ?1", [buyer_id])?;
        tx.commit()?;

        let taken = summed + moved;
        if taken > 0 {
            log::info!("Order {} took {} more line(s) from buyer {}", order_id, taken, buyer_id);
        }
        Ok(taken)
    }

    fn order(&self, order_id: i64) -> ShopResult<Option<Order>> {
        let conn = self.conn()?;
        let order = conn
            .query_row(
                &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS),
                [order_id],
                order_from_row,
            )
            .optional()?;
        Ok(order)
    }

    fn order_lines(&self, order_id: i64) -> ShopResult<Vec<CartLine>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE ci.order_id = ?1 ORDER BY ci.id", LINE_SELECT))?;
        let lines = stmt
            .query_map([order_id], line_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lines)
    }

    fn orders(&self, status: Option<OrderStatus>) -> ShopResult<Vec<Order>> {
        let conn = self.conn()?;
        let orders = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM orders WHERE status = ?1 ORDER BY id DESC",
                    ORDER_COLUMNS
                ))?;
                let rows = stmt.query_map([status], order_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!("SELECT {} FROM orders ORDER BY id DESC", ORDER_COLUMNS))?;
                let rows = stmt.query_map([], order_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(orders)
    }

    fn set_city(&self, order_id: i64, city: &str) -> ShopResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute("UPDATE orders SET city = ?1 WHERE id = ?2", params![city, order_id])?;
        if updated == 0 {
            return Err(ShopError::not_found("order", order_id));
        }
        Ok(())
    }

    fn set_branch_number(&self, order_id: i64, branch_number: i64) -> ShopResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE orders SET branch_number = ?1 WHERE id = ?2",
            params![branch_number, order_id],
        )?;
        if updated == 0 {
            return Err(ShopError::not_found("order", order_id));
        }
        Ok(())
    }

    fn set_status(&self, order_id: i64, status: OrderStatus) -> ShopResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE orders SET status = ?1 WHERE id = ?2",
            params![status, order_id],
        )?;
        if updated == 0 {
            return Err(ShopError::not_found("order", order_id));
        }
        Ok(())
    }
}
