pub mod enums;
pub mod error;
pub mod money;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::TradeSide;
pub use error::CoreError;
pub use money::round_usd;
pub use structs::{normalize_symbol, Lot, Quote, TradeIntent, TradeReceipt};
