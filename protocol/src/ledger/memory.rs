use std::collections::HashMap;

use alloy::primitives::B256;
use tokio::sync::Mutex;
use tracing::debug;

use super::{resolve_existing, RecordOutcome, SettlementLedger};
use crate::crypto::poseidon::Commitment;
use crate::error::Result;

/// In-memory implementation of `SettlementLedger`.
///
/// The check and the insert happen under one lock, so concurrent
/// recorders of the same commitment see exactly one `Recorded`.
#[derive(Default)]
pub struct InMemoryLedger {
    settlements: Mutex<HashMap<Commitment, B256>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.settlements.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.settlements.lock().await.is_empty()
    }
}

impl SettlementLedger for InMemoryLedger {
    async fn record_settlement(&self, commitment: Commitment, tx_hash: B256) -> Result<RecordOutcome> {
        let mut settlements = self.settlements.lock().await;
        if let Some(outcome) = resolve_existing(&commitment, settlements.get(&commitment).copied(), tx_hash)? {
            return Ok(outcome);
        }
        settlements.insert(commitment, tx_hash);
        debug!(%commitment, %tx_hash, "settlement recorded");
        Ok(RecordOutcome::Recorded)
    }

    async fn lookup_settlement(&self, commitment: Commitment) -> Result<Option<B256>> {
        Ok(self.settlements.lock().await.get(&commitment).copied())
    }
}
