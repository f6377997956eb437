//! Payment lifecycle
//!
//! A payment moves through nine stages, each the result of a distinct call:
//!
//! ```text
//! KeysEstablished → CommitmentComputed → ProofGenerated → ProofVerified
//!   → StealthAddressPublished → FundsDispatched → PaymentDiscovered
//!   → StealthKeyRecovered → FundsWithdrawn
//! ```
//!
//! The protocol functions themselves are stateless; [`PaymentLifecycle`]
//! lets callers (and the pipeline tests) make the order explicit. Skipping
//! a stage, e.g. withdrawing before the recovered address was checked, is
//! rejected.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PayrollError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PaymentStage {
    KeysEstablished,
    CommitmentComputed,
    ProofGenerated,
    ProofVerified,
    StealthAddressPublished,
    FundsDispatched,
    PaymentDiscovered,
    StealthKeyRecovered,
    FundsWithdrawn,
}

impl PaymentStage {
    pub const ALL: [PaymentStage; 9] = [
        PaymentStage::KeysEstablished,
        PaymentStage::CommitmentComputed,
        PaymentStage::ProofGenerated,
        PaymentStage::ProofVerified,
        PaymentStage::StealthAddressPublished,
        PaymentStage::FundsDispatched,
        PaymentStage::PaymentDiscovered,
        PaymentStage::StealthKeyRecovered,
        PaymentStage::FundsWithdrawn,
    ];

    pub fn next(self) -> Option<PaymentStage> {
        let index = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(index + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

/// Tracks one payment through its stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLifecycle {
    stage: PaymentStage,
    history: Vec<PaymentStage>,
}

impl Default for PaymentLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentLifecycle {
    /// Starts at `KeysEstablished`
    pub fn new() -> Self {
        Self {
            stage: PaymentStage::KeysEstablished,
            history: vec![PaymentStage::KeysEstablished],
        }
    }

    pub fn stage(&self) -> PaymentStage {
        self.stage
    }

    pub fn history(&self) -> &[PaymentStage] {
        &self.history
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move to `to`, which must be the immediate successor of the current stage
    pub fn transition(&mut self, to: PaymentStage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(PayrollError::LifecycleViolation { from: self.stage, to });
        }
        debug!(from = ?self.stage, ?to, "payment stage advanced");
        self.stage = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to the next stage
    pub fn advance(&mut self) -> Result<PaymentStage> {
        let to = self.stage.next().ok_or(PayrollError::LifecycleViolation {
            from: self.stage,
            to: self.stage,
        })?;
        self.transition(to)?;
        Ok(to)
    }
}
