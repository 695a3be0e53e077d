use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// The body of a CoinGecko `/simple/price` response: a map from coin id to
/// its prices in the requested fiat currencies, e.g.
/// `{"bitcoin": {"usd": 50000.0}}`. An unrecognized coin id is simply
/// absent from the map.
pub type SimplePriceResponse = HashMap<String, PriceEntry>;

#[derive(Debug, Clone, Deserialize)]
pub struct PriceEntry {
    /// Parsed straight from the JSON number into an exact decimal.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub usd: Option<Decimal>,
}
