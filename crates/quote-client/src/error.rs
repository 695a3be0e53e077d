use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("The price request exceeded its time bound")]
    Timeout,

    #[error("The quote API does not recognize the symbol '{0}'")]
    NotFound(String),

    #[error("The price request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to deserialize the quote API response: {0}")]
    Deserialization(String),
}
