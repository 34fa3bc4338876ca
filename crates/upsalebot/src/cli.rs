use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use upsalecore::core::types::OrderStatus;

#[derive(Parser, Debug)]
#[command(name = "upsale")]
#[command(author, version, about = "Telegram storefront bot with a small back-office CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Apply pending database migrations and exit
    Migrate,

    /// Create or update products, packs and prices from a JSON file
    ImportCatalog {
        /// Path to the catalog JSON
        path: PathBuf,
    },

    /// List orders, newest first
    Orders {
        /// Only orders in this status (new, in_progress, done)
        #[arg(long, value_parser = parse_status)]
        status: Option<OrderStatus>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Move an order one step forward: new → in_progress → done
    SetOrderStatus {
        /// Order id
        id: i64,

        /// Target status
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
}

fn parse_status(s: &str) -> Result<OrderStatus, String> {
    OrderStatus::from_str(s).map_err(|_| format!("unknown status '{}', expected new, in_progress or done", s))
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["upsale"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_orders_status_filter() {
        let cli = Cli::try_parse_from(["upsale", "orders", "--status", "in_progress"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Orders {
                status: Some(OrderStatus::InProgress),
                json: false,
            })
        );
        assert!(Cli::try_parse_from(["upsale", "orders", "--status", "shipped"]).is_err());
    }

    #[test]
    fn test_set_order_status_args() {
        let cli = Cli::try_parse_from(["upsale", "set-order-status", "12", "done"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::SetOrderStatus {
                id: 12,
                status: OrderStatus::Done,
            })
        );
    }

    #[test]
    fn test_import_catalog_path() {
        let cli = Cli::try_parse_from(["upsale", "import-catalog", "catalog.json"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::ImportCatalog {
                path: PathBuf::from("catalog.json"),
            })
        );
    }
}
