use crate::enums::TradeSide;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalizes a user-supplied coin symbol to the canonical form used by the
/// ledger and the quote API: trimmed and lowercased (e.g. " Bitcoin " -> "bitcoin").
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One discrete purchase record: a symbol and the amount bought in a single
/// trade. Lots are independently sellable and are never merged; buying the
/// same symbol twice produces two lots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Stable, unique row id assigned by the ledger on insert.
    pub id: i64,
    pub symbol: String,
    /// Always strictly positive; a lot that reaches zero is deleted.
    pub amount: Decimal,
}

/// A validated, transient request to trade. Not persisted; input to the
/// trade engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub amount: Decimal,
    pub side: TradeSide,
}

impl TradeIntent {
    /// Builds a buy intent, rejecting empty symbols and non-positive amounts
    /// before any I/O happens.
    pub fn buy(symbol: &str, amount: Decimal) -> Result<Self, CoreError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(CoreError::InvalidInput(
                "symbol".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "amount".to_string(),
                format!("must be positive, got {}", amount),
            ));
        }
        Ok(Self {
            symbol,
            amount,
            side: TradeSide::Buy,
        })
    }
}

/// The outcome of a successfully executed trade, returned to the caller.
/// Receipts are informational and are not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub receipt_id: Uuid,
    pub symbol: String,
    pub side: TradeSide,
    pub amount: Decimal,
    /// Quoted unit price in USD. Zero for a sell executed under the
    /// burn policy, where no quote is taken.
    pub unit_price: Decimal,
    /// Cost for a buy, proceeds for a sell. Already rounded to cents.
    pub total: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// A single, non-cached price observation for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub unit_price_usd: Decimal,
}
