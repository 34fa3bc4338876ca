//! Back-office subcommands: migrations, catalog import and order handling.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indoc::formatdoc;
use serde::Serialize;
use upsalecore::core::config;
use upsalecore::core::types::{OrderStatus, Price};
use upsalecore::shop::{CartPolicy, OrderSummary, Shop};
use upsalecore::storage::{CatalogFile, CatalogRepository, SqliteStore};

use crate::telegram::views::format_price;

/// Opens the configured database, applying pending migrations.
pub fn open_store() -> Result<SqliteStore> {
    SqliteStore::open(&config::DATABASE_PATH)
        .with_context(|| format!("open database {}", config::DATABASE_PATH.as_str()))
}

fn open_shop() -> Result<Shop<SqliteStore>> {
    Ok(Shop::new(Arc::new(open_store()?), CartPolicy::from_config()))
}

pub fn migrate() -> Result<()> {
    open_store()?;
    println!("✅ Database {} is up to date", config::DATABASE_PATH.as_str());
    Ok(())
}

pub fn import_catalog(path: &Path) -> Result<()> {
    let catalog = CatalogFile::load(path)?;
    let report = open_store()?.import_catalog(&catalog)?;
    println!(
        "📦 Imported {}: products +{} ~{}, packs +{}, units +{} ~{}",
        path.display(),
        report.products_created,
        report.products_updated,
        report.packs_created,
        report.units_created,
        report.units_updated
    );
    Ok(())
}

pub fn list_orders(status: Option<OrderStatus>, json: bool) -> Result<()> {
    let shop = open_shop()?;
    let summaries = shop.order_summaries(status)?;
    let names = product_names(shop.store())?;

    if json {
        let rows: Vec<OrderRow> = summaries.iter().map(|s| OrderRow::new(s, &names)).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No orders");
        return Ok(());
    }
    for summary in &summaries {
        println!("{}", format_order(summary, &names));
    }
    println!(
        "{} order(s), {} in total",
        summaries.len(),
        format_price(grand_total(&summaries))
    );
    Ok(())
}

pub fn set_order_status(order_id: i64, status: OrderStatus) -> Result<()> {
    let order = open_shop()?.set_order_status(order_id, status)?;
    println!("{} Order #{} is now {}", order.status.emoji(), order.id, order.status);
    Ok(())
}

fn product_names(store: &SqliteStore) -> Result<HashMap<i64, String>> {
    Ok(store
        .listings()?
        .into_iter()
        .map(|listing| (listing.product.id, listing.product.name))
        .collect())
}

/// Human-readable order card for the terminal.
pub fn format_order(summary: &OrderSummary, product_names: &HashMap<i64, String>) -> String {
    let order = &summary.order;
    let buyer = &summary.buyer;

    let lines: String = summary
        .lines
        .iter()
        .map(|line| {
            let name = product_names
                .get(&line.unit.product_id)
                .map(String::as_str)
                .unwrap_or("?");
            format!(
                "  {} {} × {} = {}\n",
                name,
                line.unit.pack.label(),
                line.quantity,
                format_price(line.subtotal())
            )
        })
        .collect();

    formatdoc! {"
        {emoji} Order #{id} · {created} · {status}
        Buyer: {buyer} {phone}
        Delivery: {city}, branch {branch}
        {lines}Total: {total}
        ",
        emoji = order.status.emoji(),
        id = order.id,
        created = order.created.format("%d.%m.%Y"),
        status = order.status,
        buyer = buyer.name,
        phone = buyer.phone_number.as_deref().unwrap_or("no phone"),
        city = order.city.as_deref().unwrap_or("?"),
        branch = order.branch_number.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string()),
        lines = lines,
        total = format_price(summary.total_price()),
    }
}

#[derive(Debug, Serialize)]
pub struct OrderRow {
    pub id: i64,
    pub status: String,
    pub created: String,
    pub buyer_id: i64,
    pub buyer: String,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub branch_number: Option<i64>,
    pub lines: Vec<OrderLineRow>,
    /// Decimal string, same format the catalog import accepts
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct OrderLineRow {
    pub unit_id: i64,
    pub product: String,
    pub pack: String,
    pub quantity: u32,
    pub price: String,
}

impl OrderRow {
    pub fn new(summary: &OrderSummary, product_names: &HashMap<i64, String>) -> Self {
        let order = &summary.order;
        Self {
            id: order.id,
            status: order.status.to_string(),
            created: order.created.to_string(),
            buyer_id: summary.buyer.id,
            buyer: summary.buyer.name.clone(),
            phone_number: summary.buyer.phone_number.clone(),
            city: order.city.clone(),
            branch_number: order.branch_number,
            lines: summary
                .lines
                .iter()
                .map(|line| OrderLineRow {
                    unit_id: line.unit.id,
                    product: product_names.get(&line.unit.product_id).cloned().unwrap_or_default(),
                    pack: line.unit.pack.label(),
                    quantity: line.quantity,
                    price: line.unit.price.to_string(),
                })
                .collect(),
            total: summary.total_price().to_string(),
        }
    }
}

/// Sum of every listed order, for the footer of `orders`.
pub fn grand_total(summaries: &[OrderSummary]) -> Price {
    summaries.iter().map(OrderSummary::total_price).sum()
}
