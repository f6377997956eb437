//! On-chain verifier contract
//!
//! `verifyProof` is a view function, so verification is a plain `eth_call`
//! and needs no signer.

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use tracing::debug;

use super::types::{ContractProofArgs, PublicSignals};
use super::verifier::ProofVerifier;
use crate::error::{PayrollError, Result};

sol! {
    #[sol(rpc)]
    interface IPaymentVerifier {
        function verifyProof(
            uint256[2] calldata _pA,
            uint256[2][2] calldata _pB,
            uint256[2] calldata _pC,
            uint256[8] calldata _pubSignals
        ) external view returns (bool);
    }
}

/// [`ProofVerifier`] backed by a deployed Groth16 verifier contract
#[derive(Clone)]
pub struct ContractVerifier {
    provider: DynProvider,
    address: Address,
}

impl ContractVerifier {
    pub fn new(provider: DynProvider, address: Address) -> Self {
        Self { provider, address }
    }

    /// Read-only HTTP connection to `rpc_url`
    pub fn connect(rpc_url: &str, address: Address) -> Result<Self> {
        let url = rpc_url
            .parse::<Url>()
            .map_err(|e| PayrollError::VerificationCall(format!("invalid RPC URL: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self::new(provider, address))
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl ProofVerifier for ContractVerifier {
    async fn verify_proof(&self, proof: &ContractProofArgs, public_signals: &PublicSignals) -> Result<bool> {
        let verifier = IPaymentVerifier::new(self.address, &self.provider);
        debug!(verifier = %self.address, "calling verifyProof");

        // a revert here is a failed call, not a rejected proof: generated
        // verifiers return false for bad proofs
        verifier
            .verifyProof(proof.p_a, proof.p_b, proof.p_c, public_signals.to_u256_array())
            .call()
            .await
            .map_err(|e| PayrollError::VerificationCall(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "contract"
    }
}
