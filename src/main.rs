use alerter::{AlertScheduler, LatestNotification};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use core_types::{Lot, TradeReceipt};
use engine::TradeEngine;
use ledger::LedgerStore;
use quote_client::CoinGeckoClient;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// The fixed logical name of the recurring price alert job.
const PRICE_ALERT_JOB: &str = "price-alert";

/// A personal crypto-portfolio simulator: virtual cash, lot-based holdings,
/// live-quoted trades and periodic price alerts.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buy an amount of a coin at the current quoted price.
    Buy {
        /// The coin id to buy (e.g. "bitcoin").
        #[arg(long)]
        symbol: String,

        /// How many units to buy (e.g. 0.5).
        #[arg(long)]
        amount: Decimal,
    },

    /// Sell one previously bought lot.
    Sell {
        /// The lot id shown in the portfolio listing.
        #[arg(long)]
        lot_id: i64,
    },

    /// Show the cash balance and current holdings.
    Portfolio {
        /// Keep running and re-render whenever the holdings change.
        #[arg(long)]
        follow: bool,
    },

    /// Run the periodic price alert in the foreground until Ctrl-C.
    Alerts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment overrides from .env, if present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = configuration::load_config()?;

    // Explicit startup initialization: one store handle, passed to every
    // component that needs it.
    let pool = ledger::connect(&config.database.url).await?;
    ledger::run_migrations(&pool).await?;
    let store = LedgerStore::open(pool, config.trading.starting_cash).await?;

    let quote_service = Arc::new(CoinGeckoClient::new(&config.quote)?);
    let trade_engine = TradeEngine::new(
        quote_service.clone(),
        store.clone(),
        config.trading.sell_proceeds,
    );

    match cli.command {
        Commands::Buy { symbol, amount } => {
            let receipt = trade_engine.execute_buy(&symbol, amount).await?;
            print_receipt(&receipt);
            print_balance(&store).await?;
        }
        Commands::Sell { lot_id } => {
            let receipt = trade_engine.execute_sell(lot_id).await?;
            print_receipt(&receipt);
            print_balance(&store).await?;
        }
        Commands::Portfolio { follow } => {
            let mut lots_rx = store.watch_lots();
            print_balance(&store).await?;
            print_lots(&lots_rx.borrow_and_update());

            while follow {
                lots_rx.changed().await?;
                print_balance(&store).await?;
                print_lots(&lots_rx.borrow_and_update());
            }
        }
        Commands::Alerts => {
            // The background job gets its own client bounded by the alert
            // fetch timeout; the interactive bound is much tighter.
            let alert_quotes = Arc::new(CoinGeckoClient::with_timeout(
                &config.quote,
                config.alerts.fetch_timeout(),
            )?);
            let sink = Arc::new(LatestNotification::new());
            let scheduler =
                AlertScheduler::new(alert_quotes, sink.clone(), config.alerts.clone());

            scheduler.enable(PRICE_ALERT_JOB).await;
            println!(
                "Price alerts for '{}' every {}s. Press Ctrl-C to stop.",
                config.alerts.symbol, config.alerts.period_secs
            );

            tokio::signal::ctrl_c().await?;
            scheduler.disable(PRICE_ALERT_JOB).await;
            if let Some(alert) = sink.latest() {
                println!(
                    "Last update: {} at ${} ({})",
                    alert.symbol, alert.unit_price_usd, alert.observed_at
                );
            }
        }
    }

    Ok(())
}

fn print_receipt(receipt: &TradeReceipt) {
    println!(
        "{:?} {} {} @ ${} (total ${}), receipt {}",
        receipt.side,
        receipt.amount,
        receipt.symbol,
        receipt.unit_price,
        receipt.total,
        receipt.receipt_id
    );
}

async fn print_balance(store: &LedgerStore) -> anyhow::Result<()> {
    println!("Cash balance: ${}", store.read_cash().await?);
    Ok(())
}

fn print_lots(lots: &[Lot]) {
    if lots.is_empty() {
        println!("No holdings.");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("Lot"),
        Cell::new("Symbol"),
        Cell::new("Amount"),
    ]);
    for lot in lots {
        table.add_row(vec![
            Cell::new(lot.id),
            Cell::new(&lot.symbol),
            Cell::new(lot.amount),
        ]);
    }
    println!("{table}");
}
