use crate::error::{Result, TraderError};
use crate::models::TradeRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable storage for the full trade history
pub trait LedgerStore: Send + Sync + 'static {
    /// Stored records, or `None` when nothing has been stored yet
    fn load(&self) -> Result<Option<Vec<TradeRecord>>>;

    /// Replace the stored history with `records`
    fn save(&self, records: &[TradeRecord]) -> Result<()>;
}

/// Stores the history as one pretty-printed JSON array
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous history intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Keep an unreadable history aside so the next save cannot destroy it
    fn quarantine(&self) {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".corrupt-{}", chrono::Utc::now().timestamp()));
        let backup = self.path.with_file_name(name);

        match fs::rename(&self.path, &backup) {
            Ok(()) => tracing::warn!(backup = %backup.display(), "Moved unreadable trade history aside"),
            Err(e) => tracing::warn!("Failed to move unreadable trade history aside: {}", e),
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<TradeRecord>>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&data) {
            Ok(records) => Ok(Some(records)),
            Err(e) => {
                self.quarantine();
                Err(TraderError::Persistence(format!(
                    "{} is not a valid trade history: {}",
                    self.path.display(),
                    e
                )))
            }
        }
    }

    fn save(&self, records: &[TradeRecord]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let data = serde_json::to_vec_pretty(records)?;
        let temp = self.temp_path();
        fs::write(&temp, data)?;
        fs::rename(&temp, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeAction;

    fn record(timestamp: i64) -> TradeRecord {
        TradeRecord {
            timestamp,
            action: TradeAction::Buy,
            price: 100.0,
            quantity: 0.5,
            profit_loss_percent: None,
            base_balance_after: 0.5,
            quote_balance_after: 950.0,
        }
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("trade_history.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history").join("trade_history.json"));

        store.save(&[record(1), record(2)]).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, vec![record(1), record(2)]);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_balances_reload_bit_for_bit() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("trade_history.json"));

        // Leftovers of fee arithmetic that a lossy parser reads back one ulp off
        let mut awkward = record(1);
        awkward.base_balance_after = 0.0037399999999999938;
        awkward.quote_balance_after = 1000.0 - 20.02 - 0.1 - 0.2;
        awkward.quantity = 0.07246 * 3.0;

        store.save(&[awkward.clone()]).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(
            loaded[0].base_balance_after.to_bits(),
            awkward.base_balance_after.to_bits()
        );
        assert_eq!(loaded, vec![awkward]);
    }

    #[test]
    fn test_corrupt_file_is_error_and_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trade_history.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(TraderError::Persistence(_))));
        assert!(!path.exists());

        let backups = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_reads_history_written_by_earlier_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trade_history.json");
        fs::write(
            &path,
            r#"[
    {"timestamp": 1700000000, "action": "buy", "price": 42000, "quantity": 0.0004,
     "btc_balance": 0.0004, "usdt_balance": 983.2},
    {"timestamp": 1700000600, "action": "sell", "price": 42300, "quantity": 0.0004,
     "profit_loss": 0.714, "btc_balance": 0, "usdt_balance": 1000.1}
]"#,
        )
        .unwrap();

        let records = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].profit_loss_percent, None);
        assert_eq!(records[1].action, TradeAction::Sell);
        assert_eq!(records[1].profit_loss_percent, Some(0.714));
    }
}
