//! Commitment → settlement transaction bookkeeping
//!
//! Closes the audit loop: once a payment carrying a commitment has been
//! dispatched, the dispatch transaction hash is recorded against that
//! commitment so anyone holding the commitment can find the settlement.
//!
//! Every store enforces first write wins:
//! - no entry: the hash is stored, [`RecordOutcome::Recorded`]
//! - same hash again: no-op, [`RecordOutcome::AlreadyRecorded`]
//! - different hash: [`PayrollError::SettlementConflict`], nothing changes

pub mod contract;
pub mod file;
pub mod memory;

use std::future::Future;

use alloy::primitives::B256;

use crate::crypto::poseidon::Commitment;
use crate::error::{PayrollError, Result};

pub use contract::{ContractLedger, OrganisationContract};
pub use file::JsonFileLedger;
pub use memory::InMemoryLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Port for settlement storage.
///
/// Implementations:
/// - `InMemoryLedger` (tests, single process)
/// - `JsonFileLedger` (local audit file)
/// - `ContractLedger` (organisation contract)
pub trait SettlementLedger: Send + Sync {
    fn record_settlement(
        &self,
        commitment: Commitment,
        tx_hash: B256,
    ) -> impl Future<Output = Result<RecordOutcome>> + Send;

    fn lookup_settlement(&self, commitment: Commitment) -> impl Future<Output = Result<Option<B256>>> + Send;
}

/// First-write-wins decision shared by every store.
///
/// `None` means the caller should write `tx_hash`.
pub(crate) fn resolve_existing(
    commitment: &Commitment,
    existing: Option<B256>,
    tx_hash: B256,
) -> Result<Option<RecordOutcome>> {
    match existing {
        None => Ok(None),
        Some(stored) if stored == tx_hash => Ok(Some(RecordOutcome::AlreadyRecorded)),
        Some(stored) => Err(PayrollError::SettlementConflict {
            commitment: commitment.to_string(),
            existing: stored,
        }),
    }
}
