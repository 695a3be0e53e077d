use async_trait::async_trait;
use configuration::QuoteConfig;
use core_types::Quote;
use std::time::Duration;

pub mod error;
pub mod responses;

// --- Public API ---
pub use error::QuoteError;
pub use responses::SimplePriceResponse;

/// The generic, abstract interface for a spot-price source.
/// This trait is the contract the trade engine and the alert scheduler use,
/// allowing the underlying implementation (live or mock) to be swapped out.
///
/// Implementations do no caching and no retrying; retries are the caller's
/// concern.
#[async_trait]
pub trait QuoteService: Send + Sync {
    /// Fetches the current USD price for a single coin symbol.
    async fn fetch_price(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

/// A concrete implementation of `QuoteService` for the CoinGecko public API.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl CoinGeckoClient {
    /// Builds a client for interactive callers, bounded by the configured
    /// request timeout.
    pub fn new(config: &QuoteConfig) -> Result<Self, QuoteError> {
        Self::with_timeout(config, config.request_timeout())
    }

    /// Builds a client with an explicit time bound. Background jobs use this
    /// with their own, longer bound; interactive and scheduled callers each
    /// get a client matching how long their caller is willing to wait.
    pub fn with_timeout(
        config: &QuoteConfig,
        request_timeout: Duration,
    ) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder()
            // The public API rejects requests without a User-Agent.
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    /// The simple-price request for one coin, with the symbol carried as a
    /// properly encoded query parameter.
    fn price_request(&self, symbol: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[("ids", symbol), ("vs_currencies", "usd")])
    }
}

#[async_trait]
impl QuoteService for CoinGeckoClient {
    async fn fetch_price(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let send = async {
            let response = self.price_request(symbol).send().await?;
            let response = response.error_for_status()?;
            response.json::<SimplePriceResponse>().await
        };

        let body = tokio::time::timeout(self.request_timeout, send)
            .await
            .map_err(|_| QuoteError::Timeout)??;

        price_from_response(symbol, body)
    }
}

/// Extracts the USD price for `symbol` from a simple-price response body.
/// CoinGecko signals an unknown coin by leaving it out of the map.
fn price_from_response(
    symbol: &str,
    body: SimplePriceResponse,
) -> Result<Quote, QuoteError> {
    let entry = body
        .get(symbol)
        .ok_or_else(|| QuoteError::NotFound(symbol.to_string()))?;

    let unit_price_usd = entry.usd.ok_or_else(|| {
        QuoteError::Deserialization(format!("no usd price in response for '{}'", symbol))
    })?;

    tracing::debug!(symbol, price = %unit_price_usd, "fetched quote");

    Ok(Quote {
        symbol: symbol.to_string(),
        unit_price_usd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn body(json: &str) -> SimplePriceResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_the_price_for_a_known_symbol() {
        let quote = price_from_response("bitcoin", body(r#"{"bitcoin":{"usd":50000.0}}"#)).unwrap();
        assert_eq!(quote.symbol, "bitcoin");
        assert_eq!(quote.unit_price_usd, dec!(50000.0));
    }

    #[test]
    fn unknown_symbol_maps_to_not_found() {
        let err = price_from_response("dogecoin", body("{}")).unwrap_err();
        assert!(matches!(err, QuoteError::NotFound(s) if s == "dogecoin"));
    }

    #[test]
    fn missing_usd_entry_is_a_deserialization_error() {
        let err = price_from_response("bitcoin", body(r#"{"bitcoin":{}}"#)).unwrap_err();
        assert!(matches!(err, QuoteError::Deserialization(_)));
    }

    fn sample_config() -> QuoteConfig {
        QuoteConfig {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            request_timeout_secs: 10,
        }
    }

    #[test]
    fn new_uses_the_configured_bound_and_with_timeout_overrides_it() {
        let config = sample_config();

        let interactive = CoinGeckoClient::new(&config).unwrap();
        assert_eq!(interactive.request_timeout, Duration::from_secs(10));

        let background =
            CoinGeckoClient::with_timeout(&config, Duration::from_secs(30)).unwrap();
        assert_eq!(background.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn price_request_encodes_the_symbol_as_a_query_parameter() {
        let client = CoinGeckoClient::new(&sample_config()).unwrap();

        let request = client.price_request("odd coin&id=x").build().unwrap();
        let url = request.url();

        assert_eq!(url.path(), "/api/v3/simple/price");
        let ids: Vec<String> = url
            .query_pairs()
            .filter(|(key, _)| key == "ids")
            .map(|(_, value)| value.into_owned())
            .collect();
        assert_eq!(ids, vec!["odd coin&id=x".to_string()]);
        assert!(!url.query().unwrap().contains("&id=x"));
    }
}
