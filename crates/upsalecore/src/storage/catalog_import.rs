//! Back-office catalog import from a JSON file.
//!
//! ```json
//! { "products": [
//!     { "name": "Kenya AA", "description": "...", "image": "https://...",
//!       "packs": [ { "unit": "г", "size": 250, "price": "180" } ] }
//! ] }
//! ```
//!
//! Products are matched by name, packs by (unit, size) and units by
//! (product, pack). Existing rows are updated in place so ids referenced by
//! carts and orders stay valid.

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context};
use rusqlite::{params, OptionalExtension, Transaction};
use serde::Deserialize;

use crate::core::config::catalog::PACK_UNIT_MAX_LEN;
use crate::core::error::ShopResult;
use crate::core::types::Price;
use crate::storage::sqlite::SqliteStore;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<CatalogProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub packs: Vec<CatalogPack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPack {
    pub unit: String,
    pub size: i64,
    /// Decimal string, e.g. "180" or "180.50"
    pub price: String,
}

impl CatalogFile {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parse catalog JSON")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_json(&json)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for product in &self.products {
            if product.name.trim().is_empty() {
                bail!("product with empty name");
            }
            for pack in &product.packs {
                if pack.size <= 0 {
                    bail!("{}: pack size must be positive, got {}", product.name, pack.size);
                }
                let unit = pack.unit.trim();
                if unit.is_empty() {
                    bail!("{}: pack unit is empty", product.name);
                }
                if unit.chars().count() > PACK_UNIT_MAX_LEN {
                    bail!(
                        "{}: pack unit {:?} is longer than {} characters",
                        product.name,
                        unit,
                        PACK_UNIT_MAX_LEN
                    );
                }
                Price::from_str(&pack.price).map_err(|e| anyhow::anyhow!("{}: {}", product.name, e))?;
            }
        }
        Ok(())
    }
}

/// Row counts touched by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub products_created: usize,
    pub products_updated: usize,
    pub packs_created: usize,
    pub units_created: usize,
    pub units_updated: usize,
}

impl SqliteStore {
    /// Applies the whole file in one transaction; an invalid entry leaves the
    /// catalog untouched.
    pub fn import_catalog(&self, catalog: &CatalogFile) -> ShopResult<ImportReport> {
        catalog.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut report = ImportReport::default();

        for product in &catalog.products {
            let product_id = upsert_product(&tx, product, &mut report)?;
            for pack in &product.packs {
                let pack_id = get_or_create_pack(&tx, pack, &mut report)?;
                let price = Price::from_str(&pack.price).map_err(anyhow::Error::msg)?;
                upsert_unit(&tx, product_id, pack_id, price, &mut report)?;
            }
        }

        tx.commit()?;
        log::info!("📦 Catalog imported: {:?}", report);
        Ok(report)
    }
}

fn upsert_product(tx: &Transaction<'_>, product: &CatalogProduct, report: &mut ImportReport) -> ShopResult<i64> {
    let name = product.name.trim();
    let existing: Option<i64> = tx
        .query_row("SELECT id FROM products WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;

    match existing {
        Some(id) => {
            tx.execute(
                "UPDATE products SET description = ?1, image = ?2 WHERE id = ?3",
                params![product.description, product.image, id],
            )?;
            report.products_updated += 1;
            Ok(id)
        }
        None => {
            tx.execute(
                "INSERT INTO products (name, description, image) VALUES (?1, ?2, ?3)",
                params![name, product.description, product.image],
            )?;
            report.products_created += 1;
            Ok(tx.last_insert_rowid())
        }
    }
}

fn get_or_create_pack(tx: &Transaction<'_>, pack: &CatalogPack, report: &mut ImportReport) -> ShopResult<i64> {
    let unit = pack.unit.trim();
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM packs WHERE unit = ?1 AND size = ?2",
            params![unit, pack.size],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }
    tx.execute("INSERT INTO packs (unit, size) VALUES (?1, ?2)", params![unit, pack.size])?;
    report.packs_created += 1;
    Ok(tx.last_insert_rowid())
}

fn upsert_unit(
    tx: &Transaction<'_>,
    product_id: i64,
    pack_id: i64,
    price: Price,
    report: &mut ImportReport,
) -> ShopResult<()> {
    let updated = tx.execute(
        "UPDATE stock_keeping_units SET price = ?1 WHERE product_id = ?2 AND pack_id = ?3",
        params![price, product_id, pack_id],
    )?;
    if updated > 0 {
        report.units_updated += 1;
        return Ok(());
    }
    tx.execute(
        "INSERT INTO stock_keeping_units (product_id, pack_id, price) VALUES (?1, ?2, ?3)",
        params![product_id, pack_id, price],
    )?;
    report.units_created += 1;
    Ok(())
}
