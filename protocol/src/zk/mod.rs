//! Zero-knowledge proof plumbing
//!
//! - `types`: proof, public signals, witness and the contract argument layout
//! - `prover`: [`ProofService`] over a [`ProvingBackend`]
//! - `verifier`: [`VerifierAdapter`] over a [`ProofVerifier`]
//! - `circuit`: the payment relation as R1CS constraints
//! - `arkworks`: in-process Groth16 prover and verifier
//! - `snarkjs`: prover that shells out to snarkjs
//! - `contract`: on-chain verifier contract

pub mod arkworks;
pub mod circuit;
pub mod contract;
pub mod prover;
pub mod snarkjs;
pub mod types;
pub mod verifier;

pub use arkworks::{ArkworksProver, ArkworksVerifier, CircuitKeys};
pub use contract::ContractVerifier;
pub use prover::{ProofService, ProverConfig, ProvingBackend};
pub use snarkjs::SnarkjsProver;
pub use types::{
    to_contract_call_arguments, ContractProofArgs, Groth16Proof, PaymentWitness, PublicSignals,
    PUBLIC_SIGNAL_COUNT, PUBLIC_SIGNAL_NAMES,
};
pub use verifier::{ProofVerifier, VerifierAdapter, VerifierConfig};
