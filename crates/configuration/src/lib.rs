use crate::error::ConfigError;
use rust_decimal::Decimal;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AlertConfig, Config, DatabaseConfig, QuoteConfig, SellProceedsPolicy, TradingConfig,
};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file, layers `COINFOLIO_*` environment variables on top
/// (e.g. `COINFOLIO_DATABASE__URL`), deserializes the result into our
/// strongly-typed `Config` struct, validates it, and returns it.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `config.toml`
        .add_source(config::File::with_name("config.toml"))
        .add_source(config::Environment::with_prefix("COINFOLIO").separator("__"))
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

/// Rejects configurations that would violate ledger invariants at startup
/// rather than at trade time.
fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.trading.starting_cash < Decimal::ZERO {
        return Err(ConfigError::ValidationError(format!(
            "trading.starting_cash must not be negative, got {}",
            config.trading.starting_cash
        )));
    }
    if config.alerts.symbol.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "alerts.symbol must not be empty".to_string(),
        ));
    }
    if config.alerts.period_secs == 0 {
        return Err(ConfigError::ValidationError(
            "alerts.period_secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}
