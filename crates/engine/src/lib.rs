//! # Coinfolio Engine Crate
//!
//! The trade engine turns a user's buy or sell request into a ledger
//! mutation, bridging the asynchronous quote API and the ledger's atomic
//! commits.
//!
//! ## Architectural Principles
//!
//! - **Stateless:** The engine holds no mutable state of its own, only
//!   handles to its collaborators. Any number of tasks may call it
//!   concurrently; all serialization happens inside the ledger store.
//! - **Validate, Quote, Commit:** Requests are rejected before any I/O if
//!   they are malformed; a failed quote never touches the ledger; and the
//!   commit itself is all-or-nothing. A trade that has committed is final
//!   even if the caller has since gone away.
//!
//! ## Public API
//!
//! - `TradeEngine`: the component wired up at startup with a quote service,
//!   a ledger store and the sell-proceeds policy.
//! - `EngineError`: the specific error types that can be returned from this crate.

use chrono::Utc;
use configuration::SellProceedsPolicy;
use core_types::{round_usd, Lot, Quote, TradeIntent, TradeReceipt, TradeSide};
use ledger::LedgerStore;
use quote_client::QuoteService;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub mod error;

pub use error::EngineError;

/// Executes buy and sell intents against the ledger at live quoted prices.
#[derive(Clone)]
pub struct TradeEngine {
    quote_service: Arc<dyn QuoteService>,
    ledger: LedgerStore,
    sell_proceeds: SellProceedsPolicy,
}

impl TradeEngine {
    pub fn new(
        quote_service: Arc<dyn QuoteService>,
        ledger: LedgerStore,
        sell_proceeds: SellProceedsPolicy,
    ) -> Self {
        Self {
            quote_service,
            ledger,
            sell_proceeds,
        }
    }

    /// Buys `amount` units of `symbol` at the current quoted price.
    ///
    /// The symbol is normalized and the request validated before any I/O.
    /// The cost is `price * amount` rounded to cents (half-even), debited
    /// atomically with the lot insert; `InsufficientFunds` propagates from
    /// the ledger verbatim.
    pub async fn execute_buy(
        &self,
        symbol: &str,
        amount: Decimal,
    ) -> Result<TradeReceipt, EngineError> {
        let intent = TradeIntent::buy(symbol, amount)
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let quote = self.quote_service.fetch_price(&intent.symbol).await?;
        let cost = round_usd(quote.unit_price_usd * intent.amount);

        let lot_id = self
            .ledger
            .commit_buy(&intent.symbol, intent.amount, cost)
            .await?;

        tracing::info!(
            lot_id,
            symbol = %intent.symbol,
            amount = %intent.amount,
            cost = %cost,
            "buy executed"
        );

        Ok(receipt(&quote, TradeSide::Buy, intent.amount, cost))
    }

    /// Sells the lot with the given id.
    ///
    /// Under the `Burn` policy the lot is simply removed and the receipt is
    /// zero-valued. Under `CreditAtQuote` the lot's symbol is re-quoted and
    /// the proceeds are credited to cash atomically with the removal; if the
    /// quote fails, the sell is aborted and the ledger is untouched. A lot
    /// that no longer exists (e.g. sold by a racing call) is `LotNotFound`.
    pub async fn execute_sell(&self, lot_id: i64) -> Result<TradeReceipt, EngineError> {
        match self.sell_proceeds {
            SellProceedsPolicy::Burn => {
                let lot = self.ledger.commit_sell(lot_id, None).await?;
                tracing::info!(lot_id, symbol = %lot.symbol, "sell executed (burn)");
                Ok(burn_receipt(&lot))
            }
            SellProceedsPolicy::CreditAtQuote => {
                let lot = self
                    .ledger
                    .find_lot(lot_id)
                    .await?
                    .ok_or(ledger::LedgerError::LotNotFound(lot_id))?;

                let quote = self.quote_service.fetch_price(&lot.symbol).await?;
                let proceeds = round_usd(quote.unit_price_usd * lot.amount);

                // The lot may have been sold while we were quoting; the
                // commit re-checks and fails with LotNotFound in that case.
                let lot = self.ledger.commit_sell(lot_id, Some(proceeds)).await?;

                tracing::info!(
                    lot_id,
                    symbol = %lot.symbol,
                    proceeds = %proceeds,
                    "sell executed (credited at quote)"
                );
                Ok(receipt(&quote, TradeSide::Sell, lot.amount, proceeds))
            }
        }
    }
}

fn receipt(quote: &Quote, side: TradeSide, amount: Decimal, total: Decimal) -> TradeReceipt {
    TradeReceipt {
        receipt_id: Uuid::new_v4(),
        symbol: quote.symbol.clone(),
        side,
        amount,
        unit_price: quote.unit_price_usd,
        total,
        executed_at: Utc::now(),
    }
}

/// A sell under the burn policy takes no quote, so the receipt carries no
/// price and no proceeds.
fn burn_receipt(lot: &Lot) -> TradeReceipt {
    TradeReceipt {
        receipt_id: Uuid::new_v4(),
        symbol: lot.symbol.clone(),
        side: TradeSide::Sell,
        amount: lot.amount,
        unit_price: Decimal::ZERO,
        total: Decimal::ZERO,
        executed_at: Utc::now(),
    }
}
