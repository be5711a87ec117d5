use super::LedgerStore;
use crate::error::{Result, TraderError};
use crate::models::{TradeAction, TradeRecord};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{mpsc, oneshot};

enum WriterCommand {
    Append(TradeRecord),
    Flush(oneshot::Sender<()>),
}

/// Append-only trade history with a single background writer
///
/// Appends update memory and queue the new record under the same write lock,
/// so the writer's own copy grows in exactly the in-memory order.
pub struct TradeLedger {
    records: RwLock<Vec<TradeRecord>>,
    writer: mpsc::UnboundedSender<WriterCommand>,
}

impl TradeLedger {
    /// Load the stored history and start the writer task
    ///
    /// A missing or unreadable history starts an empty ledger. Must be
    /// called from within a tokio runtime.
    pub fn open(store: Arc<dyn LedgerStore>) -> Self {
        let records = match store.load() {
            Ok(Some(records)) => {
                tracing::info!("Trade history loaded: {} trades", records.len());
                records
            }
            Ok(None) => {
                tracing::info!("No trade history found, starting empty");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Failed to load trade history ({}), starting empty", e);
                Vec::new()
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, records.clone(), rx));

        Self {
            records: RwLock::new(records),
            writer: tx,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<TradeRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TradeRecord>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append(&self, record: TradeRecord) {
        let mut records = self.write();
        records.push(record.clone());

        if self.writer.send(WriterCommand::Append(record)).is_err() {
            tracing::error!("Ledger writer is gone, trade kept in memory only");
        }
    }

    /// Read-only copy of the history, oldest first
    pub fn snapshot(&self) -> Vec<TradeRecord> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn last_action(&self) -> Option<TradeAction> {
        self.read().last().map(|r| r.action)
    }

    /// Price of the most recent buy, if any
    pub fn last_buy_price(&self) -> Option<f64> {
        self.read()
            .iter()
            .rev()
            .find(|r| r.action == TradeAction::Buy)
            .map(|r| r.price)
    }

    /// Wait until every append made so far has been handed to the store
    ///
    /// Write failures are logged by the writer, not returned here.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();

        self.writer
            .send(WriterCommand::Flush(tx))
            .map_err(|_| TraderError::Persistence("ledger writer stopped".to_string()))?;

        rx.await
            .map_err(|_| TraderError::Persistence("ledger writer stopped".to_string()))
    }
}

/// Consume commands in order, writing once per batch of queued appends
///
/// The writer owns its copy of the history and always saves all of it, so a
/// failed save is repaired by the next append.
async fn run_writer(
    store: Arc<dyn LedgerStore>,
    records: Vec<TradeRecord>,
    mut rx: mpsc::UnboundedReceiver<WriterCommand>,
) {
    let mut records = Arc::new(records);
    let mut waiting = Vec::new();

    while let Some(command) = rx.recv().await {
        let mut dirty = false;
        let mut next = Some(command);

        while let Some(command) = next.take() {
            match command {
                WriterCommand::Append(record) => {
                    Arc::make_mut(&mut records).push(record);
                    dirty = true;
                }
                WriterCommand::Flush(done) => waiting.push(done),
            }
            next = rx.try_recv().ok();
        }

        if dirty {
            let store = store.clone();
            let snapshot = records.clone();
            let count = snapshot.len();

            let outcome = tokio::task::spawn_blocking(move || store.save(&snapshot)).await;

            match outcome {
                Ok(Ok(())) => tracing::debug!(count, "Trade history saved"),
                Ok(Err(e)) => tracing::error!("Failed to save trade history: {}", e),
                Err(e) => tracing::error!("Trade history writer panicked: {}", e),
            }
        }

        for done in waiting.drain(..) {
            let _ = done.send(());
        }
    }

    tracing::debug!("Ledger writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::JsonFileStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn record(timestamp: i64, action: TradeAction, price: f64) -> TradeRecord {
        TradeRecord {
            timestamp,
            action,
            price,
            quantity: 0.001,
            profit_loss_percent: match action {
                TradeAction::Sell => Some(0.5),
                TradeAction::Buy => None,
            },
            base_balance_after: 0.0,
            quote_balance_after: 0.0,
        }
    }

    /// In-memory store that can be told to fail
    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<TradeRecord>>,
        fail: AtomicBool,
        saves: AtomicUsize,
    }

    impl LedgerStore for MemoryStore {
        fn load(&self) -> Result<Option<Vec<TradeRecord>>> {
            Ok(None)
        }

        fn save(&self, records: &[TradeRecord]) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(TraderError::Persistence("disk full".to_string()));
            }
            *self.saved.lock().unwrap() = records.to_vec();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_append_persists_whole_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("trades.json")));
        let ledger = TradeLedger::open(store.clone());

        ledger.append(record(1, TradeAction::Buy, 100.0));
        ledger.append(record(2, TradeAction::Sell, 101.0));
        ledger.flush().await.unwrap();

        assert_eq!(store.load().unwrap().unwrap(), ledger.snapshot());
        assert_eq!(ledger.last_action(), Some(TradeAction::Sell));
        assert_eq!(ledger.last_buy_price(), Some(100.0));
    }

    #[tokio::test]
    async fn test_reopen_restores_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.json");

        {
            let ledger = TradeLedger::open(Arc::new(JsonFileStore::new(&path)));
            ledger.append(record(1, TradeAction::Buy, 100.0));
            ledger.flush().await.unwrap();
        }

        let store = Arc::new(JsonFileStore::new(&path));
        let ledger = TradeLedger::open(store.clone());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last_action(), Some(TradeAction::Buy));

        // Loaded history is kept when later appends are written
        ledger.append(record(2, TradeAction::Sell, 101.0));
        ledger.flush().await.unwrap();
        let stored = store.load().unwrap().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored, ledger.snapshot());
    }

    #[tokio::test]
    async fn test_corrupt_history_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.json");
        std::fs::write(&path, "garbage").unwrap();

        let ledger = TradeLedger::open(Arc::new(JsonFileStore::new(&path)));
        assert!(ledger.is_empty());
        assert_eq!(ledger.last_action(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_match_storage() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("trades.json")));
        let ledger = Arc::new(TradeLedger::open(store.clone()));

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger.append(record(i, TradeAction::Buy, 100.0 + i as f64));
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        ledger.flush().await.unwrap();

        let stored = store.load().unwrap().unwrap();
        assert_eq!(stored.len(), 50);
        assert_eq!(stored, ledger.snapshot());
    }

    #[tokio::test]
    async fn test_failed_write_is_retried_by_next_append() {
        let store = Arc::new(MemoryStore::default());
        let ledger = TradeLedger::open(store.clone());

        store.fail.store(true, Ordering::SeqCst);
        ledger.append(record(1, TradeAction::Buy, 100.0));
        ledger.flush().await.unwrap();
        assert!(store.saved.lock().unwrap().is_empty());
        // Memory stays authoritative
        assert_eq!(ledger.len(), 1);

        store.fail.store(false, Ordering::SeqCst);
        ledger.append(record(2, TradeAction::Sell, 101.0));
        ledger.flush().await.unwrap();

        assert_eq!(*store.saved.lock().unwrap(), ledger.snapshot());
        assert!(store.saves.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_flush_on_empty_ledger_returns() {
        let ledger = TradeLedger::open(Arc::new(MemoryStore::default()));
        tokio_test::assert_ok!(ledger.flush().await);
    }
}
