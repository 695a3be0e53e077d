use ledger::LedgerError;
use quote_client::QuoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid trade: {0}")]
    Validation(String),

    #[error("Quote lookup failed: {0}")]
    Quote(#[from] QuoteError),

    #[error("Ledger commit failed: {0}")]
    Ledger(#[from] LedgerError),
}
