use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Mutex;

/// The payload of one background price check.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlert {
    pub symbol: String,
    pub unit_price_usd: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// Where successful price checks deliver their result. One logical slot:
/// implementations are expected to replace the previous notification rather
/// than stack a new one.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, alert: PriceAlert);
}

/// The shipped sink: a single in-process slot holding the most recent alert,
/// logged on every update.
#[derive(Default)]
pub struct LatestNotification {
    slot: Mutex<Option<PriceAlert>>,
}

impl LatestNotification {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published alert, if any check has succeeded yet.
    pub fn latest(&self) -> Option<PriceAlert> {
        self.slot.lock().expect("notification slot poisoned").clone()
    }
}

#[async_trait]
impl NotificationSink for LatestNotification {
    async fn publish(&self, alert: PriceAlert) {
        tracing::info!(
            symbol = %alert.symbol,
            price = %alert.unit_price_usd,
            "price update"
        );
        *self.slot.lock().expect("notification slot poisoned") = Some(alert);
    }
}
