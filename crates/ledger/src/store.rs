use crate::error::LedgerError;
use core_types::Lot;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;
use sqlx::{FromRow, Row, Sqlite, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// The wallet table holds a single row under this key.
const CASH_KEY: &str = "cash";

/// A lot row as persisted, with the amount still in its canonical string form.
#[derive(Debug, Clone, FromRow)]
struct DbLot {
    id: i64,
    symbol: String,
    amount: String,
}

impl DbLot {
    fn into_lot(self) -> Result<Lot, LedgerError> {
        let amount = Decimal::from_str(&self.amount).map_err(|e| {
            LedgerError::Corrupt(format!(
                "lot {} has amount '{}': {}",
                self.id, self.amount, e
            ))
        })?;
        Ok(Lot {
            id: self.id,
            symbol: self.symbol,
            amount,
        })
    }
}

/// The durable home of the cash balance and the lot collection, and the
/// single point through which they are mutated.
///
/// All mutating calls take the store's write lock and run inside one database
/// transaction, so concurrent buys and sells are serialized and each is
/// all-or-nothing: readers only ever observe fully committed states. Every
/// committed mutation publishes a fresh lot snapshot to `watch_lots`
/// subscribers.
///
/// The store is cheap to clone; clones share the pool, the write lock and
/// the snapshot channel.
#[derive(Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
    lots_tx: Arc<watch::Sender<Vec<Lot>>>,
}

impl LedgerStore {
    /// Opens the store over a migrated pool, seeding the cash balance with
    /// `starting_cash` if and only if no balance has ever been stored.
    pub async fn open(pool: SqlitePool, starting_cash: Decimal) -> Result<Self, LedgerError> {
        let seeded = sqlx::query("INSERT OR IGNORE INTO wallet (key, cash) VALUES (?, ?)")
            .bind(CASH_KEY)
            .bind(starting_cash.to_string())
            .execute(&pool)
            .await?;
        if seeded.rows_affected() > 0 {
            tracing::info!(%starting_cash, "seeded initial cash balance");
        }

        let lots = load_lots(&pool).await?;
        let (lots_tx, _) = watch::channel(lots);

        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
            lots_tx: Arc::new(lots_tx),
        })
    }

    /// Returns the current cash balance. Safe to call from any number of
    /// concurrent readers.
    pub async fn read_cash(&self) -> Result<Decimal, LedgerError> {
        let row = sqlx::query("SELECT cash FROM wallet WHERE key = ?")
            .bind(CASH_KEY)
            .fetch_one(&self.pool)
            .await?;
        let cash: String = row.try_get("cash")?;
        parse_cash(&cash)
    }

    /// Subscribes to the stream of lot-list snapshots, newest lot first.
    ///
    /// The receiver starts with the current snapshot and sees a new one after
    /// every committed mutation, in commit order. The stream ends (the
    /// channel closes) only when the store itself is dropped.
    pub fn watch_lots(&self) -> watch::Receiver<Vec<Lot>> {
        self.lots_tx.subscribe()
    }

    /// Looks a lot up by id without touching it.
    pub async fn find_lot(&self, lot_id: i64) -> Result<Option<Lot>, LedgerError> {
        let row: Option<DbLot> =
            sqlx::query_as("SELECT id, symbol, amount FROM lots WHERE id = ?")
                .bind(lot_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(DbLot::into_lot).transpose()
    }

    /// Atomically debits `cost` from the cash balance and inserts a new lot.
    ///
    /// If the balance cannot cover the cost, fails with `InsufficientFunds`
    /// and changes nothing. On success returns the new lot's id; the debit
    /// and the insert become visible to readers together or not at all.
    pub async fn commit_buy(
        &self,
        symbol: &str,
        amount: Decimal,
        cost: Decimal,
    ) -> Result<i64, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let cash = cash_in_tx(&mut tx).await?;
        if cash < cost {
            // Dropping the open transaction rolls it back.
            return Err(LedgerError::InsufficientFunds {
                required: cost.to_string(),
                available: cash.to_string(),
            });
        }

        write_cash_in_tx(&mut tx, cash - cost).await?;

        let inserted = sqlx::query("INSERT INTO lots (symbol, amount) VALUES (?, ?)")
            .bind(symbol)
            .bind(amount.to_string())
            .execute(&mut *tx)
            .await?;
        let lot_id = inserted.last_insert_rowid();

        // Read the snapshot inside the transaction: once the commit succeeds
        // nothing fallible stands between the caller and its Ok.
        let snapshot = load_lots(&mut *tx).await?;
        tx.commit().await?;
        tracing::info!(symbol, %amount, %cost, lot_id, "buy committed");

        self.lots_tx.send_replace(snapshot);
        Ok(lot_id)
    }

    /// Atomically removes a lot and, when `credit` is given, adds that amount
    /// back to the cash balance in the same transaction.
    ///
    /// Fails with `LotNotFound` if the lot no longer exists, e.g. because a
    /// racing sell got there first. Returns the removed lot.
    pub async fn commit_sell(
        &self,
        lot_id: i64,
        credit: Option<Decimal>,
    ) -> Result<Lot, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let row: Option<DbLot> =
            sqlx::query_as("SELECT id, symbol, amount FROM lots WHERE id = ?")
                .bind(lot_id)
                .fetch_optional(&mut *tx)
                .await?;
        let lot = row.ok_or(LedgerError::LotNotFound(lot_id))?.into_lot()?;

        sqlx::query("DELETE FROM lots WHERE id = ?")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;

        if let Some(credit) = credit {
            let cash = cash_in_tx(&mut tx).await?;
            write_cash_in_tx(&mut tx, cash + credit).await?;
        }

        let snapshot = load_lots(&mut *tx).await?;
        tx.commit().await?;
        tracing::info!(lot_id, symbol = %lot.symbol, credited = ?credit, "sell committed");

        self.lots_tx.send_replace(snapshot);
        Ok(lot)
    }
}

fn parse_cash(raw: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(raw)
        .map_err(|e| LedgerError::Corrupt(format!("cash balance '{}': {}", raw, e)))
}

async fn cash_in_tx(tx: &mut Transaction<'_, Sqlite>) -> Result<Decimal, LedgerError> {
    let row = sqlx::query("SELECT cash FROM wallet WHERE key = ?")
        .bind(CASH_KEY)
        .fetch_one(&mut **tx)
        .await?;
    let cash: String = row.try_get("cash")?;
    parse_cash(&cash)
}

async fn write_cash_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    new_cash: Decimal,
) -> Result<(), LedgerError> {
    sqlx::query("UPDATE wallet SET cash = ? WHERE key = ?")
        .bind(new_cash.to_string())
        .bind(CASH_KEY)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Fetches the full lot list in the default read order, newest first.
/// Takes any executor so commits can read their own uncommitted writes.
async fn load_lots<'e, E>(executor: E) -> Result<Vec<Lot>, LedgerError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows: Vec<DbLot> =
        sqlx::query_as("SELECT id, symbol, amount FROM lots ORDER BY id DESC")
            .fetch_all(executor)
            .await?;
    rows.into_iter().map(DbLot::into_lot).collect()
}
