//! # Coinfolio Alerter Crate
//!
//! A recurring, ledger-independent background job: on a fixed period it
//! fetches the configured coin's price and publishes it to a notification
//! sink, retrying failed checks with backoff instead of crashing.
//!
//! ## Architectural Principles
//!
//! - **Keyed, Idempotent Schedules:** Jobs are registered under a stable
//!   logical name. Enabling a name that is already active replaces the old
//!   job, so there is never more than one schedule per name.
//! - **Independent of the Ledger:** The job only reads prices and writes
//!   notifications; it never mutates portfolio state.
//! - **Autonomous Retries:** There is no user to re-prompt, so a failed
//!   check retries itself a bounded number of times with doubling backoff,
//!   then stays quiet until the next tick.
//!
//! ## Public API
//!
//! - `AlertScheduler`: registers, replaces and cancels named periodic jobs.
//! - `AlertState`: the observable state of one job.
//! - `NotificationSink` / `LatestNotification`: where results are delivered.
//! - `AlerterError`: the specific error types that can be returned from this crate.

use chrono::Utc;
use configuration::AlertConfig;
use quote_client::QuoteService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub mod error;
pub mod sink;

pub use error::AlerterError;
pub use sink::{LatestNotification, NotificationSink, PriceAlert};

/// The observable state of one scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    /// Waiting for the next tick.
    Idle,
    /// A check is in flight.
    Running,
    /// The last check failed; a retry is pending its backoff.
    RetryPending,
    /// The job has been cancelled and will not run again.
    Disabled,
}

/// A registered schedule: the signal to stop it, the task running it, and
/// its state channel.
struct AlertJob {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    state_rx: watch::Receiver<AlertState>,
}

/// Drives named periodic price checks, each on its own background task.
pub struct AlertScheduler {
    quote_service: Arc<dyn QuoteService>,
    sink: Arc<dyn NotificationSink>,
    config: AlertConfig,
    jobs: Mutex<HashMap<String, AlertJob>>,
}

impl AlertScheduler {
    pub fn new(
        quote_service: Arc<dyn QuoteService>,
        sink: Arc<dyn NotificationSink>,
        config: AlertConfig,
    ) -> Self {
        Self {
            quote_service,
            sink,
            config,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Starts the periodic check under the given logical name; the first
    /// check runs immediately. If a job with that name is already active it
    /// is stopped and replaced, so enabling is idempotent and two schedules
    /// for one name never overlap.
    ///
    /// Returns a receiver observing the job's state transitions.
    pub async fn enable(&self, name: &str) -> watch::Receiver<AlertState> {
        let mut jobs = self.jobs.lock().await;

        if let Some(previous) = jobs.remove(name) {
            // Replacement must not leave the old schedule running alongside
            // the new one, so it is stopped hard.
            previous.handle.abort();
            tracing::info!(name, "replacing existing alert schedule");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(AlertState::Idle);

        let worker = Worker {
            quote_service: Arc::clone(&self.quote_service),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
        };
        let handle = tokio::spawn(worker.run(shutdown_rx, state_tx));

        tracing::info!(name, period_secs = self.config.period_secs, "alert schedule enabled");
        jobs.insert(
            name.to_string(),
            AlertJob {
                shutdown_tx,
                handle,
                state_rx: state_rx.clone(),
            },
        );
        state_rx
    }

    /// Cancels all future runs of the named job. An in-flight check is
    /// allowed to complete. Returns false if no such job was active.
    pub async fn disable(&self, name: &str) -> bool {
        let mut jobs = self.jobs.lock().await;
        match jobs.remove(name) {
            Some(job) => {
                let _ = job.shutdown_tx.send(true);
                tracing::info!(name, "alert schedule disabled");
                true
            }
            None => false,
        }
    }

    pub async fn is_enabled(&self, name: &str) -> bool {
        self.jobs.lock().await.contains_key(name)
    }

    pub async fn active_jobs(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// The state channel of a named job, if it is active.
    pub async fn state_of(&self, name: &str) -> Option<watch::Receiver<AlertState>> {
        self.jobs
            .lock()
            .await
            .get(name)
            .map(|job| job.state_rx.clone())
    }
}

/// The background task behind one schedule.
struct Worker {
    quote_service: Arc<dyn QuoteService>,
    sink: Arc<dyn NotificationSink>,
    config: AlertConfig,
}

impl Worker {
    async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        state_tx: watch::Sender<AlertState>,
    ) {
        let mut ticker = tokio::time::interval(self.config.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Fires on disable, or when the scheduler itself is dropped.
                _ = shutdown_rx.changed() => {
                    let _ = state_tx.send(AlertState::Disabled);
                    break;
                }
                _ = ticker.tick() => {
                    self.check_with_retries(&state_tx).await;
                    let _ = state_tx.send(AlertState::Idle);
                }
            }
        }
    }

    /// One scheduled run: the check plus its bounded retries. Failures are
    /// contained here; the schedule itself never dies.
    async fn check_with_retries(&self, state_tx: &watch::Sender<AlertState>) {
        let attempts = self.config.retry_max_attempts.max(1);
        for attempt in 1..=attempts {
            let _ = state_tx.send(AlertState::Running);
            match self.check_once().await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "scheduled price check failed");
                    if attempt == attempts {
                        break;
                    }
                    let _ = state_tx.send(AlertState::RetryPending);
                    let backoff = self.config.retry_backoff() * 2u32.pow(attempt - 1);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        tracing::error!(
            symbol = %self.config.symbol,
            "price check exhausted its retries; waiting for the next tick"
        );
    }

    async fn check_once(&self) -> Result<(), AlerterError> {
        let quote = tokio::time::timeout(
            self.config.fetch_timeout(),
            self.quote_service.fetch_price(&self.config.symbol),
        )
        .await
        .map_err(|_| AlerterError::Timeout)??;

        self.sink
            .publish(PriceAlert {
                symbol: quote.symbol,
                unit_price_usd: quote.unit_price_usd,
                observed_at: Utc::now(),
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_types::Quote;
    use quote_client::QuoteError;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_config() -> AlertConfig {
        AlertConfig {
            symbol: "bitcoin".to_string(),
            period_secs: 900,
            fetch_timeout_secs: 30,
            retry_max_attempts: 3,
            retry_backoff_secs: 5,
        }
    }

    /// Succeeds every call after failing the first `failures` of them.
    struct FlakyQuote {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyQuote {
        fn reliable() -> Arc<Self> {
            Arc::new(Self {
                failures: 0,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing_first(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QuoteService for FlakyQuote {
        async fn fetch_price(&self, symbol: &str) -> Result<Quote, QuoteError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(QuoteError::NotFound(symbol.to_string()));
            }
            Ok(Quote {
                symbol: symbol.to_string(),
                unit_price_usd: dec!(50000) + Decimal::from(call),
            })
        }
    }

    /// Records everything published to it.
    #[derive(Default)]
    struct RecordingSink {
        alerts: std::sync::Mutex<Vec<PriceAlert>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.alerts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn publish(&self, alert: PriceAlert) {
            self.alerts.lock().unwrap().push(alert);
        }
    }

    /// Takes a fixed amount of time before answering.
    struct SlowQuote {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteService for SlowQuote {
        async fn fetch_price(&self, symbol: &str) -> Result<Quote, QuoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Quote {
                symbol: symbol.to_string(),
                unit_price_usd: dec!(50000),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_period() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = AlertScheduler::new(FlakyQuote::reliable(), sink.clone(), test_config());

        scheduler.enable("price-alert").await;
        // First check at enable, then one per 900s period.
        tokio::time::sleep(Duration::from_secs(1850)).await;

        assert_eq!(sink.count(), 3);
        scheduler.disable("price-alert").await;
    }

    #[tokio::test(start_paused = true)]
    async fn enabling_twice_keeps_a_single_schedule() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = AlertScheduler::new(FlakyQuote::reliable(), sink.clone(), test_config());

        scheduler.enable("price-alert").await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.enable("price-alert").await;

        assert_eq!(scheduler.active_jobs().await, 1);

        // Two live schedules would publish twice per period.
        tokio::time::sleep(Duration::from_secs(1850)).await;
        assert_eq!(sink.count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn disable_cancels_future_runs() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = AlertScheduler::new(FlakyQuote::reliable(), sink.clone(), test_config());

        let mut state = scheduler.enable("price-alert").await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.count(), 1);

        assert!(scheduler.disable("price-alert").await);
        assert!(!scheduler.is_enabled("price-alert").await);
        // Disabling a job that is not active reports false.
        assert!(!scheduler.disable("price-alert").await);

        state.wait_for(|s| *s == AlertState::Disabled).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_check_retries_with_backoff_then_succeeds() {
        let quotes = FlakyQuote::failing_first(1);
        let sink = Arc::new(RecordingSink::default());
        let scheduler = AlertScheduler::new(quotes.clone(), sink.clone(), test_config());

        scheduler.enable("price-alert").await;
        // First attempt fails at t=0; the retry lands after the 5s backoff.
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(quotes.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sink.count(), 1);
        scheduler.disable("price-alert").await;
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_wait_for_the_next_tick() {
        let quotes = FlakyQuote::failing_first(usize::MAX);
        let sink = Arc::new(RecordingSink::default());
        let scheduler = AlertScheduler::new(quotes.clone(), sink.clone(), test_config());

        scheduler.enable("price-alert").await;
        // 3 attempts with 5s and 10s backoffs all fail; nothing is published
        // and the job stays registered for its next tick.
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(quotes.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sink.count(), 0);
        assert!(scheduler.is_enabled("price-alert").await);

        // The next tick starts a fresh round of attempts.
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(quotes.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn a_fetch_slower_than_the_interactive_bound_still_publishes() {
        // A background check has the full 30s fetch window to itself; a
        // 15s answer lands well inside it.
        let quotes = Arc::new(SlowQuote {
            delay: Duration::from_secs(15),
            calls: AtomicUsize::new(0),
        });
        let sink = Arc::new(RecordingSink::default());
        let scheduler = AlertScheduler::new(quotes, sink.clone(), test_config());

        scheduler.enable("price-alert").await;
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(sink.count(), 0);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(sink.count(), 1);
        scheduler.disable("price-alert").await;
    }

    #[tokio::test(start_paused = true)]
    async fn a_fetch_past_the_full_window_times_out_and_retries() {
        let quotes = Arc::new(SlowQuote {
            delay: Duration::from_secs(31),
            calls: AtomicUsize::new(0),
        });
        let sink = Arc::new(RecordingSink::default());
        let scheduler = AlertScheduler::new(quotes.clone(), sink.clone(), test_config());

        scheduler.enable("price-alert").await;
        // Timeouts at 30s, 65s and 105s exhaust the three attempts.
        tokio::time::sleep(Duration::from_secs(110)).await;

        assert_eq!(quotes.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sink.count(), 0);
        assert!(scheduler.is_enabled("price-alert").await);
        scheduler.disable("price-alert").await;
    }
}
