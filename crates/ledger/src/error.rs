use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds: the trade costs {required} but only {available} is available")]
    InsufficientFunds {
        required: String,
        available: String,
    },

    #[error("No lot with id {0} exists (it may already have been sold)")]
    LotNotFound(i64),

    #[error("The ledger database operation failed: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Ledger migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("The ledger contains an unreadable value: {0}")]
    Corrupt(String),
}
