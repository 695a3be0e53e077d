//! # Coinfolio Ledger Crate
//!
//! This crate is the durable home of the portfolio: the cash balance and the
//! collection of purchase lots, persisted in SQLite.
//!
//! ## Architectural Principles
//!
//! - **Single Point of Mutation:** Every write to persisted state funnels
//!   through `LedgerStore::commit_buy` / `commit_sell`. No other component
//!   touches the database directly.
//! - **Serialized, Atomic Commits:** Mutations take a single write lock and
//!   run inside one database transaction, so a buy and a sell racing from
//!   different tasks never interleave partially. A rejected or failed commit
//!   leaves the ledger exactly as it was.
//! - **Reactive Reads:** `watch_lots` hands out a snapshot stream that emits
//!   the full lot list after every commit, in commit order, for presentation
//!   layers to render.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: explicit startup initialization; the pool
//!   is passed to `LedgerStore::open` and the store handle to collaborators.
//! - `LedgerStore`: the store handle with all read and commit operations.
//! - `LedgerError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::LedgerError;
pub use store::LedgerStore;
