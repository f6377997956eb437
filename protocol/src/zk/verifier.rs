//! Proof verification
//!
//! The adapter only marshals arguments; the pairing check lives behind
//! [`ProofVerifier`] (the on-chain verifier contract, or a local arkworks
//! verifier that reads the same argument layout).
//!
//! Outcomes are kept apart:
//! - `Ok(false)`: the verifier ran and rejected the proof
//! - `Err(VerificationCall)`: the call itself failed; retryable

use std::future::Future;
use std::time::Duration;

use tracing::{info, instrument, warn};

use super::types::{ContractProofArgs, PublicSignals};
use crate::error::{PayrollError, Result};
use crate::retry::{with_retry, RetryPolicy};

/// Port for `verifyProof(pA, pB, pC, publicSignals) -> bool`
pub trait ProofVerifier: Send + Sync {
    fn verify_proof(
        &self,
        proof: &ContractProofArgs,
        public_signals: &PublicSignals,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct VerifierAdapter<V> {
    verifier: V,
    config: VerifierConfig,
}

impl<V: ProofVerifier> VerifierAdapter<V> {
    pub fn new(verifier: V, config: VerifierConfig) -> Self {
        Self { verifier, config }
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// `true` if the proof verifies against `public_signals`.
    ///
    /// Signals are passed in prover order, untouched.
    #[instrument(skip_all, fields(verifier = self.verifier.name(), commitment = %public_signals.commitment()))]
    pub async fn verify(&self, proof: &ContractProofArgs, public_signals: &PublicSignals) -> Result<bool> {
        let timeout = self.config.timeout;
        let valid = with_retry(&self.config.retry, "verify", |_| async move {
            match tokio::time::timeout(timeout, self.verifier.verify_proof(proof, public_signals)).await {
                Ok(result) => result,
                Err(_) => Err(PayrollError::VerificationCall(format!(
                    "verifier timed out after {}s",
                    timeout.as_secs()
                ))),
            }
        })
        .await?;

        if valid {
            info!("proof verified");
        } else {
            warn!("proof rejected");
        }
        Ok(valid)
    }

    /// Like [`Self::verify`], but a rejection is `ProofVerificationFailed`
    pub async fn require_valid(&self, proof: &ContractProofArgs, public_signals: &PublicSignals) -> Result<()> {
        if self.verify(proof, public_signals).await? {
            Ok(())
        } else {
            Err(PayrollError::ProofVerificationFailed)
        }
    }
}
