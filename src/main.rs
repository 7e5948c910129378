//! storefront-cart - operator tool for the storefront cart core

use anyhow::Result;
use clap::{Parser, Subcommand};
use storefront_cart::checkout::{pending_attempts, CheckoutJournal, FileJournal};
use storefront_cart::{visible_products, ApiClient, CatalogService, StorefrontConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "storefront-cart", version, about = "Inspect the storefront catalog and checkout journal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List paid checkout attempts whose stock updates never completed,
    /// with the units still owed per product
    Pending,
    /// List products a shopper can buy
    Products {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// Include sold-out products
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = StorefrontConfig::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    match cli.command {
        Command::Pending => {
            let journal = FileJournal::new(&config.journal_path);
            let pending = pending_attempts(&journal.records().await?);
            if pending.is_empty() {
                tracing::info!(path = %config.journal_path.display(), "no checkout attempts awaiting reconciliation");
            }
            for attempt in pending {
                let outstanding: Vec<String> = attempt.outstanding.iter().map(|l| format!("{}x{}", l.product_id, l.quantity)).collect();
                println!("{}\t{}\t{}\t{}", attempt.attempt_id, attempt.quote.amount_minor, attempt.quote.total, outstanding.join(","));
            }
        }
        Command::Products { category, search, all } => {
            let api = ApiClient::new(&config.api_base_url);
            let products = match (search, category) {
                (Some(query), _) => api.search(&query).await?,
                (None, category) => api.products(category.as_deref()).await?,
            };
            for product in visible_products(products, all) {
                let badge = if product.is_low_stock() { " (last units)" } else { "" };
                println!("{}\t{}\t{}\t{}{}", product.id(), product.name(), product.price(), product.stock(), badge);
            }
        }
    }
    Ok(())
}
