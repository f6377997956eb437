//! Error taxonomy for the payroll protocol
//!
//! Every failure the core can produce is a variant of [`PayrollError`].
//! Nothing in the library catches and discards these; the only local
//! recovery is the bounded retry in [`crate::retry`] for failures that
//! report themselves as retryable.
//!
//! Messages never carry private key bytes, shared secrets or nonces.

use alloy::primitives::{Address, B256};

use crate::lifecycle::PaymentStage;

pub type Result<T> = std::result::Result<T, PayrollError>;

/// Protocol phase a failure belongs to, for user-facing reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Keys,
    Commitment,
    Proof,
    Verification,
    StealthAddress,
    Settlement,
    Lifecycle,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Keys => "key management",
            Phase::Commitment => "commitment",
            Phase::Proof => "proof generation",
            Phase::Verification => "proof verification",
            Phase::StealthAddress => "stealth address",
            Phase::Settlement => "settlement",
            Phase::Lifecycle => "payment lifecycle",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    #[error("invalid key: {0}")]
    KeyFormat(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("`{field}` exceeds the proving field modulus")]
    FieldOverflow { field: &'static str },

    #[error("poseidon hash failed: {0}")]
    Poseidon(String),

    #[error("witness is missing required value `{0}`")]
    Witness(String),

    #[error("proving backend failed: {message}")]
    ProvingBackend { message: String, transient: bool },

    #[error("proof rejected by verifier")]
    ProofVerificationFailed,

    #[error("verification call failed: {0}")]
    VerificationCall(String),

    #[error("curve operation produced a degenerate point during {0}")]
    CurveOperation(&'static str),

    #[error("recovered stealth address {recovered} does not match published address {expected}")]
    StealthDerivationMismatch { expected: Address, recovered: Address },

    #[error("commitment {commitment} already settled by transaction {existing}")]
    SettlementConflict { commitment: String, existing: B256 },

    #[error("settlement storage error: {0}")]
    Storage(String),

    #[error("ledger transaction failed: {0}")]
    Transaction(String),

    #[error("proof generation cancelled")]
    Cancelled,

    #[error("payment cannot move from {from:?} to {to:?}")]
    LifecycleViolation { from: PaymentStage, to: PaymentStage },
}

impl PayrollError {
    /// A prover failure that is not tied to the witness itself
    pub fn transient_backend(message: impl Into<String>) -> Self {
        Self::ProvingBackend { message: message.into(), transient: true }
    }

    /// A prover failure caused by the inputs (e.g. unsatisfiable constraints)
    pub fn fatal_backend(message: impl Into<String>) -> Self {
        Self::ProvingBackend { message: message.into(), transient: false }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Cryptographic rejections (`ProofVerificationFailed`,
    /// `StealthDerivationMismatch`) are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PayrollError::ProvingBackend { transient: true, .. } | PayrollError::VerificationCall(_)
        )
    }

    pub fn phase(&self) -> Phase {
        match self {
            PayrollError::KeyFormat(_) | PayrollError::KeyGeneration(_) => Phase::Keys,
            PayrollError::FieldOverflow { .. } | PayrollError::Poseidon(_) => Phase::Commitment,
            PayrollError::Witness(_)
            | PayrollError::ProvingBackend { .. }
            | PayrollError::Cancelled => Phase::Proof,
            PayrollError::ProofVerificationFailed | PayrollError::VerificationCall(_) => {
                Phase::Verification
            }
            PayrollError::CurveOperation(_) | PayrollError::StealthDerivationMismatch { .. } => {
                Phase::StealthAddress
            }
            PayrollError::SettlementConflict { .. }
            | PayrollError::Storage(_)
            | PayrollError::Transaction(_) => Phase::Settlement,
            PayrollError::LifecycleViolation { .. } => Phase::Lifecycle,
        }
    }
}
