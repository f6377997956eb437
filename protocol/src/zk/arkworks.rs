//! In-process Groth16 over BN254
//!
//! - [`CircuitKeys`]: development setup for the payment circuit (a single
//!   party samples the toxic waste, so keys from here are for testing and
//!   local operation only, never for a production verifier)
//! - [`ArkworksProver`]: a [`ProvingBackend`] that proves on a blocking
//!   worker thread
//! - [`ArkworksVerifier`]: a [`ProofVerifier`] that reads the verifier
//!   contract's argument layout, swapped `pB` included

use std::sync::Arc;

use alloy::primitives::U256;
use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::{BigInt, PrimeField};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use super::circuit::PaymentCircuit;
use super::prover::ProvingBackend;
use super::types::{ContractProofArgs, Groth16Proof, PaymentWitness, PublicSignals};
use super::verifier::ProofVerifier;
use crate::crypto::field::Coordinate;
use crate::error::{PayrollError, Result};

// ============================================================================
// Keys
// ============================================================================

/// Groth16 proving key (which embeds the verifying key) for the payment circuit
#[derive(Clone)]
pub struct CircuitKeys {
    proving_key: ProvingKey<Bn254>,
}

impl CircuitKeys {
    /// Single-party setup. Anyone holding the RNG output can forge proofs.
    pub fn generate_dev<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let circuit = PaymentCircuit::blank()?;
        let (proving_key, _) = Groth16::<Bn254>::setup(circuit, rng)
            .map_err(|e| PayrollError::fatal_backend(format!("circuit setup failed: {e}")))?;
        Ok(Self { proving_key })
    }

    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.proving_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.proving_key.vk
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| PayrollError::fatal_backend(format!("proving key encoding failed: {e}")))?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| PayrollError::fatal_backend(format!("invalid proving key: {e}")))?;
        Ok(Self { proving_key })
    }

    pub fn verifying_key_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.verifying_key()
            .serialize_compressed(&mut bytes)
            .map_err(|e| PayrollError::VerificationCall(format!("verifying key encoding failed: {e}")))?;
        Ok(bytes)
    }
}

// ============================================================================
// Prover
// ============================================================================

pub struct ArkworksProver {
    proving_key: Arc<ProvingKey<Bn254>>,
}

impl ArkworksProver {
    pub fn new(keys: &CircuitKeys) -> Self {
        Self { proving_key: Arc::new(keys.proving_key.clone()) }
    }
}

impl ProvingBackend for ArkworksProver {
    async fn full_prove(&self, witness: &PaymentWitness) -> Result<(Groth16Proof, PublicSignals)> {
        let signals = witness.expected_public_signals()?;
        let check_circuit = PaymentCircuit::from_witness(witness)?;
        let circuit = PaymentCircuit::from_witness(witness)?;
        let proving_key = Arc::clone(&self.proving_key);

        let proof = tokio::task::spawn_blocking(move || -> Result<Proof<Bn254>> {
            // Groth16 happily proves false statements; reject them up front
            let cs = ConstraintSystem::<Fr>::new_ref();
            check_circuit
                .generate_constraints(cs.clone())
                .map_err(|e| PayrollError::fatal_backend(format!("constraint synthesis failed: {e}")))?;
            let satisfied = cs
                .is_satisfied()
                .map_err(|e| PayrollError::fatal_backend(format!("constraint check failed: {e}")))?;
            if !satisfied {
                return Err(PayrollError::fatal_backend(
                    "witness does not satisfy the payment constraints",
                ));
            }

            Groth16::<Bn254>::prove(&proving_key, circuit, &mut OsRng)
                .map_err(|e| PayrollError::fatal_backend(format!("groth16 prover failed: {e}")))
        })
        .await
        .map_err(|e| PayrollError::transient_backend(format!("prover worker failed: {e}")))??;

        debug!("arkworks proof created");
        Ok((proof_to_snarkjs(&proof), signals))
    }

    fn name(&self) -> &'static str {
        "arkworks"
    }
}

/// snarkjs JSON layout of an arkworks proof
pub fn proof_to_snarkjs(proof: &Proof<Bn254>) -> Groth16Proof {
    let fq = |f: &Fq| Coordinate::from_ark(f);
    Groth16Proof::new(
        [fq(&proof.a.x), fq(&proof.a.y)],
        [
            [fq(&proof.b.x.c0), fq(&proof.b.x.c1)],
            [fq(&proof.b.y.c0), fq(&proof.b.y.c1)],
        ],
        [fq(&proof.c.x), fq(&proof.c.y)],
    )
}

// ============================================================================
// Verifier
// ============================================================================

pub struct ArkworksVerifier {
    verifying_key: PreparedVerifyingKey<Bn254>,
}

impl ArkworksVerifier {
    pub fn new(verifying_key: &VerifyingKey<Bn254>) -> Self {
        Self { verifying_key: prepare_verifying_key(verifying_key) }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| PayrollError::VerificationCall(format!("invalid verifying key: {e}")))?;
        Ok(Self::new(&vk))
    }
}

impl ProofVerifier for ArkworksVerifier {
    async fn verify_proof(&self, proof: &ContractProofArgs, public_signals: &PublicSignals) -> Result<bool> {
        // malformed points are a rejected proof, like the precompile's revert
        let Some(proof) = proof_from_contract_args(proof) else {
            debug!("proof points are not valid curve points");
            return Ok(false);
        };
        let inputs: Vec<Fr> = public_signals.as_array().iter().map(|s| s.to_ark()).collect();

        Groth16::<Bn254>::verify_proof(&self.verifying_key, &proof, &inputs)
            .map_err(|e| PayrollError::VerificationCall(format!("groth16 verifier failed: {e}")))
    }

    fn name(&self) -> &'static str {
        "arkworks"
    }
}

fn fq(value: U256) -> Option<Fq> {
    Fq::from_bigint(BigInt::new(*value.as_limbs()))
}

fn g1(point: [U256; 2]) -> Option<G1Affine> {
    let p = G1Affine::new_unchecked(fq(point[0])?, fq(point[1])?);
    (p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve()).then_some(p)
}

/// Reads `[[x.c1, x.c0], [y.c1, y.c0]]`, the verifier contract layout
fn g2(point: [[U256; 2]; 2]) -> Option<G2Affine> {
    let x = Fq2::new(fq(point[0][1])?, fq(point[0][0])?);
    let y = Fq2::new(fq(point[1][1])?, fq(point[1][0])?);
    let p = G2Affine::new_unchecked(x, y);
    (p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve()).then_some(p)
}

fn proof_from_contract_args(args: &ContractProofArgs) -> Option<Proof<Bn254>> {
    Some(Proof { a: g1(args.p_a)?, b: g2(args.p_b)?, c: g1(args.p_c)? })
}
