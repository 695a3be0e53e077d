use quote_client::QuoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlerterError {
    #[error("The scheduled price check timed out")]
    Timeout,

    #[error("The scheduled price check failed: {0}")]
    Quote(#[from] QuoteError),
}
