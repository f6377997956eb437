//! Payment relation as an R1CS circuit
//!
//! Public inputs, in allocation (and public-signal) order:
//! `viewX, viewY, spendX, spendY, paymentType, startDate, endDate, commitment`
//!
//! Private inputs: `amount, secretNonce`
//!
//! Constraint: `commitment == Poseidon(amount, secretNonce, viewX, viewY,
//! spendX, spendY, paymentType, startDate, endDate)` with the same
//! circom-compatible parameters the commitment builder uses.

use ark_bn254::Fr;
use ark_ff::Zero;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use light_poseidon::parameters::bn254_x5::get_poseidon_parameters;
use light_poseidon::PoseidonParameters;

use super::types::{PaymentWitness, PUBLIC_SIGNAL_COUNT, PUBLIC_SIGNAL_NAMES};
use crate::crypto::poseidon::COMMITMENT_ARITY;
use crate::error::{PayrollError, Result};

const POSEIDON_WIDTH: u8 = COMMITMENT_ARITY as u8 + 1;

/// Circuit instance; all values `None` for key generation
pub struct PaymentCircuit {
    params: PoseidonParameters<Fr>,
    amount: Option<Fr>,
    secret_nonce: Option<Fr>,
    public: [Option<Fr>; PUBLIC_SIGNAL_COUNT],
}

impl PaymentCircuit {
    /// Shape-only instance for setup
    pub fn blank() -> Result<Self> {
        Ok(Self {
            params: poseidon_parameters()?,
            amount: None,
            secret_nonce: None,
            public: [None; PUBLIC_SIGNAL_COUNT],
        })
    }

    pub fn from_witness(witness: &PaymentWitness) -> Result<Self> {
        let mut public = [None; PUBLIC_SIGNAL_COUNT];
        for (slot, name) in public.iter_mut().zip(PUBLIC_SIGNAL_NAMES) {
            *slot = Some(witness.require(name)?.to_ark());
        }
        Ok(Self {
            params: poseidon_parameters()?,
            amount: Some(witness.require("amount")?.to_ark()),
            secret_nonce: Some(witness.require("secretNonce")?.to_ark()),
            public,
        })
    }
}

fn poseidon_parameters() -> Result<PoseidonParameters<Fr>> {
    get_poseidon_parameters::<Fr>(POSEIDON_WIDTH).map_err(|e| PayrollError::Poseidon(e.to_string()))
}

impl ConstraintSynthesizer<Fr> for PaymentCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> std::result::Result<(), SynthesisError> {
        let mut public = Vec::with_capacity(PUBLIC_SIGNAL_COUNT);
        for value in self.public {
            public.push(FpVar::new_input(cs.clone(), || {
                value.ok_or(SynthesisError::AssignmentMissing)
            })?);
        }
        let amount = FpVar::new_witness(cs.clone(), || {
            self.amount.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nonce = FpVar::new_witness(cs.clone(), || {
            self.secret_nonce.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // hash order: amount, nonce, then the seven hashed public signals
        let mut inputs = vec![amount, nonce];
        inputs.extend_from_slice(&public[..PUBLIC_SIGNAL_COUNT - 1]);

        let digest = poseidon_gadget(&self.params, &inputs)?;
        digest.enforce_equal(&public[PUBLIC_SIGNAL_COUNT - 1])
    }
}

/// In-circuit Poseidon, round-for-round identical to `light_poseidon`
fn poseidon_gadget(
    params: &PoseidonParameters<Fr>,
    inputs: &[FpVar<Fr>],
) -> std::result::Result<FpVar<Fr>, SynthesisError> {
    let width = params.width;
    let mut state = Vec::with_capacity(width);
    state.push(FpVar::Constant(Fr::zero()));
    state.extend_from_slice(inputs);
    if state.len() != width {
        return Err(SynthesisError::Unsatisfiable);
    }

    let half = params.full_rounds / 2;
    let total = params.full_rounds + params.partial_rounds;
    for round in 0..total {
        for (i, s) in state.iter_mut().enumerate() {
            *s += params.ark[round * width + i];
        }

        if round < half || round >= half + params.partial_rounds {
            for s in state.iter_mut() {
                *s = sbox(s)?;
            }
        } else {
            state[0] = sbox(&state[0])?;
        }

        state = (0..width)
            .map(|i| {
                state
                    .iter()
                    .zip(&params.mds[i])
                    .fold(FpVar::Constant(Fr::zero()), |acc, (s, m)| acc + s * *m)
            })
            .collect();
    }

    Ok(state.swap_remove(0))
}

/// x^5
fn sbox(x: &FpVar<Fr>) -> std::result::Result<FpVar<Fr>, SynthesisError> {
    let x2 = x.square()?;
    let x4 = x2.square()?;
    Ok(x4 * x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::field::FieldElement;
    use crate::crypto::poseidon::poseidon_hash;
    use ark_relations::r1cs::ConstraintSystem;

    fn witness_with(values: [u64; COMMITMENT_ARITY]) -> PaymentWitness {
        let elements: Vec<FieldElement> = values.iter().map(|v| FieldElement::from_u64(*v)).collect();
        let commitment = poseidon_hash(&elements).unwrap();
        let mut witness = PaymentWitness::default();
        for (name, value) in crate::crypto::poseidon::COMMITMENT_INPUT_NAMES.iter().zip(elements) {
            witness.insert(*name, value);
        }
        witness.insert("commitment", commitment);
        witness
    }

    #[test]
    fn test_gadget_matches_native_poseidon() {
        let witness = witness_with([1000, 999_888_777, 11, 12, 13, 14, 2, 1_700_000_000, 1_702_592_000]);
        let cs = ConstraintSystem::<Fr>::new_ref();
        PaymentCircuit::from_witness(&witness)
            .unwrap()
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_wrong_commitment_is_unsatisfied() {
        let mut witness = witness_with([1000, 1, 11, 12, 13, 14, 2, 3, 4]);
        witness.insert("commitment", FieldElement::from_u64(42));
        let cs = ConstraintSystem::<Fr>::new_ref();
        PaymentCircuit::from_witness(&witness)
            .unwrap()
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_public_input_count() {
        let witness = witness_with([1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let cs = ConstraintSystem::<Fr>::new_ref();
        PaymentCircuit::from_witness(&witness)
            .unwrap()
            .generate_constraints(cs.clone())
            .unwrap();
        // instance variables include the constant one
        assert_eq!(cs.num_instance_variables(), PUBLIC_SIGNAL_COUNT + 1);
        assert!(cs.num_witness_variables() > 2);
    }
}
