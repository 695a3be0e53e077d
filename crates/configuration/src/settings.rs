use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub quote: QuoteConfig,
    pub trading: TradingConfig,
    pub alerts: AlertConfig,
}

/// Location of the SQLite ledger database.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. "sqlite://coinfolio.db".
    pub url: String,
}

/// Parameters for the quote API client.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteConfig {
    /// Base URL of the CoinGecko-compatible price API.
    pub base_url: String,
    /// Bound on an interactive price lookup. Exceeding it is reported as a
    /// timeout, never a hang.
    pub request_timeout_secs: u64,
}

impl QuoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// What to do with the sale proceeds when a lot is sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellProceedsPolicy {
    /// Re-quote the lot's symbol at sell time and credit
    /// `price * amount` back to the cash balance.
    CreditAtQuote,
    /// Remove the lot without crediting anything.
    Burn,
}

/// Parameters for trade execution.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Cash balance seeded on first use, before any trade has run.
    pub starting_cash: Decimal,
    pub sell_proceeds: SellProceedsPolicy,
}

/// Parameters for the periodic price-alert job.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// The coin the background check watches (e.g. "bitcoin").
    pub symbol: String,
    /// Seconds between scheduled checks.
    pub period_secs: u64,
    /// Bound on the background quote fetch. Longer than the interactive
    /// timeout since no user is waiting on it.
    pub fetch_timeout_secs: u64,
    /// How many times a failed check is retried before giving up until the
    /// next tick.
    pub retry_max_attempts: u32,
    /// Initial pause before the first retry; doubles on each further attempt.
    pub retry_backoff_secs: u64,
}

impl AlertConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}
