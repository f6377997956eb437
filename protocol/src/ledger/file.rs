//! JSON file settlement ledger
//!
//! The whole map is rewritten on every record: written to a temp file in
//! the same directory, then renamed over the old one, so readers never
//! see a half-written ledger.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{resolve_existing, RecordOutcome, SettlementLedger};
use crate::crypto::poseidon::Commitment;
use crate::error::{PayrollError, Result};

const LEDGER_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    /// Decimal commitment → settlement transaction hash
    settlements: BTreeMap<String, B256>,
}

pub struct JsonFileLedger {
    path: PathBuf,
    // serialises read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded settlements, for audit listings
    pub async fn entries(&self) -> Result<Vec<(Commitment, B256)>> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        file.settlements
            .into_iter()
            .map(|(commitment, tx)| Ok((parse_commitment(&commitment)?, tx)))
            .collect()
    }

    async fn load(&self) -> Result<LedgerFile> {
        let path = self.path.clone();
        run_blocking(move || read_ledger(&path)).await
    }

    async fn store(&self, file: LedgerFile) -> Result<()> {
        let path = self.path.clone();
        run_blocking(move || write_ledger(&path, &file)).await
    }
}

impl SettlementLedger for JsonFileLedger {
    async fn record_settlement(&self, commitment: Commitment, tx_hash: B256) -> Result<RecordOutcome> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let key = commitment.to_string();

        if let Some(outcome) = resolve_existing(&commitment, file.settlements.get(&key).copied(), tx_hash)? {
            return Ok(outcome);
        }

        file.settlements.insert(key, tx_hash);
        self.store(file).await?;
        debug!(%commitment, %tx_hash, path = %self.path.display(), "settlement recorded");
        Ok(RecordOutcome::Recorded)
    }

    async fn lookup_settlement(&self, commitment: Commitment) -> Result<Option<B256>> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        Ok(file.settlements.get(&commitment.to_string()).copied())
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PayrollError::Storage(format!("ledger worker failed: {e}")))?
}

fn parse_commitment(s: &str) -> Result<Commitment> {
    s.parse()
        .map_err(|_| PayrollError::Storage(format!("corrupt ledger entry: {s}")))
}

fn read_ledger(path: &Path) -> Result<LedgerFile> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LedgerFile { version: LEDGER_VERSION, ..LedgerFile::default() })
        }
        Err(e) => return Err(PayrollError::Storage(format!("cannot read {}: {e}", path.display()))),
    };

    let file: LedgerFile = serde_json::from_slice(&bytes)
        .map_err(|e| PayrollError::Storage(format!("malformed ledger {}: {e}", path.display())))?;
    if file.version != LEDGER_VERSION {
        return Err(PayrollError::Storage(format!(
            "unsupported ledger version {} in {}",
            file.version,
            path.display()
        )));
    }
    Ok(file)
}

fn write_ledger(path: &Path, file: &LedgerFile) -> Result<()> {
    let storage = |e: std::io::Error| PayrollError::Storage(format!("cannot write {}: {e}", path.display()));

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(storage)?;

    let json = serde_json::to_vec_pretty(file)
        .map_err(|e| PayrollError::Storage(format!("ledger encoding failed: {e}")))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(storage)?;
    tmp.write_all(&json).map_err(storage)?;
    tmp.as_file().sync_all().map_err(storage)?;
    tmp.persist(path).map_err(|e| storage(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::field::FieldElement;

    fn commitment(n: u64) -> Commitment {
        Commitment::new(FieldElement::from_u64(n))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonFileLedger::new(dir.path().join("ledger.json"));

        assert_eq!(ledger.lookup_settlement(commitment(1)).await.unwrap(), None);
        assert!(ledger.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settlements_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let tx = B256::repeat_byte(0x42);

        let ledger = JsonFileLedger::new(&path);
        assert_eq!(ledger.record_settlement(commitment(7), tx).await.unwrap(), RecordOutcome::Recorded);
        drop(ledger);

        let reopened = JsonFileLedger::new(&path);
        assert_eq!(reopened.lookup_settlement(commitment(7)).await.unwrap(), Some(tx));
        assert_eq!(reopened.entries().await.unwrap(), vec![(commitment(7), tx)]);
    }

    #[tokio::test]
    async fn test_conflict_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let ledger = JsonFileLedger::new(&path);

        ledger.record_settlement(commitment(7), B256::repeat_byte(1)).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        assert_eq!(
            ledger.record_settlement(commitment(7), B256::repeat_byte(1)).await.unwrap(),
            RecordOutcome::AlreadyRecorded
        );
        assert!(ledger.record_settlement(commitment(7), B256::repeat_byte(2)).await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileLedger::new(&path).lookup_settlement(commitment(1)).await.unwrap_err();
        assert!(matches!(err, PayrollError::Storage(_)));
    }
}
