//! Proof generation
//!
//! [`ProvingBackend`] is the port to whatever actually runs Groth16
//! (snarkjs, an in-process arkworks prover, a mock in tests).
//! [`ProofService`] wraps a backend with the rules every caller needs:
//! witness completeness, timeouts, bounded retry of transient failures,
//! cancellation, and a consistency check on the returned public signals.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, Span};

use super::types::{
    signal, to_contract_call_arguments, ContractProofArgs, Groth16Proof, PaymentWitness, PublicSignals,
};
use crate::error::{PayrollError, Result};
use crate::retry::{with_retry, RetryPolicy};

/// Port for Groth16 proof generation.
///
/// Implementations:
/// - `SnarkjsProver` (shells out to `snarkjs groth16 fullprove`)
/// - `ArkworksProver` (in-process BN254 Groth16)
/// - Mock provers for testing
pub trait ProvingBackend: Send + Sync {
    /// Prove the payment relation for `witness`.
    ///
    /// Returns the proof together with the circuit's public signals in
    /// prover order. Failures caused by the witness must be reported as
    /// non-transient `ProvingBackend` errors.
    fn full_prove(
        &self,
        witness: &PaymentWitness,
    ) -> impl Future<Output = Result<(Groth16Proof, PublicSignals)>> + Send;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProverConfig {
    /// Upper bound on a single proving attempt
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct ProofService<B> {
    backend: B,
    config: ProverConfig,
}

impl<B: ProvingBackend> ProofService<B> {
    pub fn new(backend: B, config: ProverConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    /// Generate a proof that cannot be cancelled by the caller
    pub async fn generate_proof(&self, witness: &PaymentWitness) -> Result<(Groth16Proof, PublicSignals)> {
        self.generate_proof_with_cancel(witness, &CancellationToken::new()).await
    }

    /// Generate a proof, aborting with `Cancelled` as soon as `cancel` fires.
    ///
    /// Nothing is persisted, so a cancelled call leaves no partial state.
    #[instrument(skip_all, fields(backend = self.backend.name(), commitment = tracing::field::Empty))]
    pub async fn generate_proof_with_cancel(
        &self,
        witness: &PaymentWitness,
        cancel: &CancellationToken,
    ) -> Result<(Groth16Proof, PublicSignals)> {
        witness.validate()?;
        let expected = witness.expected_public_signals()?;
        Span::current().record("commitment", tracing::field::display(expected.commitment()));

        let started = Instant::now();
        let timeout = self.config.timeout;
        let work = with_retry(&self.config.retry, "prove", |attempt| async move {
            tracing::debug!(attempt, "starting proving attempt");
            match tokio::time::timeout(timeout, self.backend.full_prove(witness)).await {
                Ok(result) => result,
                Err(_) => Err(PayrollError::transient_backend(format!(
                    "prover timed out after {}s",
                    timeout.as_secs()
                ))),
            }
        });

        let (proof, signals) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("proof generation cancelled");
                return Err(PayrollError::Cancelled);
            }
            result = work => result?,
        };

        check_public_signals(&expected, &signals)?;

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "proof generated");
        Ok((proof, signals))
    }

    /// See [`to_contract_call_arguments`]
    pub fn to_contract_call_arguments(&self, proof: &Groth16Proof) -> ContractProofArgs {
        to_contract_call_arguments(proof)
    }
}

/// The prover must echo the key coordinates and commitment it was given;
/// anything else means the backend proved a different statement.
fn check_public_signals(expected: &PublicSignals, actual: &PublicSignals) -> Result<()> {
    let positions = [
        (signal::VIEW_X, "pubViewKeyX"),
        (signal::VIEW_Y, "pubViewKeyY"),
        (signal::SPEND_X, "pubSpendKeyX"),
        (signal::SPEND_Y, "pubSpendKeyY"),
        (signal::COMMITMENT, "commitment"),
    ];
    for (index, name) in positions {
        if expected.as_array()[index] != actual.as_array()[index] {
            return Err(PayrollError::fatal_backend(format!(
                "public signal {index} ({name}) does not match the witness"
            )));
        }
    }
    Ok(())
}
