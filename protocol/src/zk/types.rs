//! ZK Proof Types
//!
//! Groth16 proofs over BN254 in the snarkjs JSON layout, the public-signal
//! vector of the payment circuit, and the argument layout of the on-chain
//! `verifyProof(uint256[2], uint256[2][2], uint256[2], uint256[8])`.

use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::U256;
use k256::PublicKey;
use serde::{Deserialize, Serialize};

use crate::crypto::field::{Coordinate, FieldElement};
use crate::crypto::poseidon::{Commitment, CommitmentInputs, PaymentParameters, COMMITMENT_INPUT_NAMES};
use crate::error::{PayrollError, Result};

/// Number of public signals exposed by the payment circuit
pub const PUBLIC_SIGNAL_COUNT: usize = 8;

/// Signal name of the commitment, the only public input not hashed
pub const COMMITMENT_SIGNAL: &str = "commitment";

/// Public signal positions
pub mod signal {
    pub const VIEW_X: usize = 0;
    pub const VIEW_Y: usize = 1;
    pub const SPEND_X: usize = 2;
    pub const SPEND_Y: usize = 3;
    pub const PAYMENT_TYPE: usize = 4;
    pub const START_DATE: usize = 5;
    pub const END_DATE: usize = 6;
    pub const COMMITMENT: usize = 7;
}

/// Witness names feeding each public signal, in signal order
pub const PUBLIC_SIGNAL_NAMES: [&str; PUBLIC_SIGNAL_COUNT] = [
    "pubViewKeyX",
    "pubViewKeyY",
    "pubSpendKeyX",
    "pubSpendKeyY",
    "paymentType",
    "startDate",
    "endDate",
    COMMITMENT_SIGNAL,
];

// ============================================================================
// Proof
// ============================================================================

/// Groth16 proof as produced by `snarkjs groth16 fullprove`
///
/// Points are projective with z = 1:
/// - `pi_a`, `pi_c`: `[x, y, "1"]`
/// - `pi_b`: `[[x.c0, x.c1], [y.c0, y.c1], ["1", "0"]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: [Coordinate; 3],
    pub pi_b: [[Coordinate; 2]; 3],
    pub pi_c: [Coordinate; 3],
    pub protocol: String,
    pub curve: String,
}

impl Groth16Proof {
    pub const PROTOCOL: &'static str = "groth16";
    pub const CURVE: &'static str = "bn128";

    pub fn new(a: [Coordinate; 2], b: [[Coordinate; 2]; 2], c: [Coordinate; 2]) -> Self {
        let one = Coordinate::from_u64(1);
        Self {
            pi_a: [a[0], a[1], one],
            pi_b: [b[0], b[1], [one, Coordinate::ZERO]],
            pi_c: [c[0], c[1], one],
            protocol: Self::PROTOCOL.to_string(),
            curve: Self::CURVE.to_string(),
        }
    }
}

/// Proof arguments in the order and layout the verifier contract expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractProofArgs {
    pub p_a: [U256; 2],
    pub p_b: [[U256; 2]; 2],
    pub p_c: [U256; 2],
}

/// Convert a snarkjs proof to verifier contract arguments.
///
/// snarkjs writes each G2 coordinate as `[c0, c1]`; the EVM pairing
/// precompile (and every snarkjs-exported Solidity verifier) reads
/// `[c1, c0]`. Both inner pairs of `pi_b` are therefore swapped here. A
/// proof passed through without the swap fails verification even though
/// it is valid.
pub fn to_contract_call_arguments(proof: &Groth16Proof) -> ContractProofArgs {
    let b = &proof.pi_b;
    ContractProofArgs {
        p_a: [proof.pi_a[0].as_u256(), proof.pi_a[1].as_u256()],
        p_b: [
            [b[0][1].as_u256(), b[0][0].as_u256()],
            [b[1][1].as_u256(), b[1][0].as_u256()],
        ],
        p_c: [proof.pi_c[0].as_u256(), proof.pi_c[1].as_u256()],
    }
}

// ============================================================================
// Public Signals
// ============================================================================

/// The circuit's public outputs, in prover order:
/// `[viewX, viewY, spendX, spendY, paymentType, startDate, endDate, commitment]`
///
/// Produced together with a proof; never reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicSignals([FieldElement; PUBLIC_SIGNAL_COUNT]);

impl PublicSignals {
    pub fn new(values: [FieldElement; PUBLIC_SIGNAL_COUNT]) -> Self {
        Self(values)
    }

    pub fn from_decimal_strings<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        if values.len() != PUBLIC_SIGNAL_COUNT {
            return Err(PayrollError::fatal_backend(format!(
                "expected {PUBLIC_SIGNAL_COUNT} public signals, got {}",
                values.len()
            )));
        }
        let mut out = [FieldElement::ZERO; PUBLIC_SIGNAL_COUNT];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = FieldElement::from_decimal(value.as_ref(), "public signal")?;
        }
        Ok(Self(out))
    }

    pub fn as_array(&self) -> &[FieldElement; PUBLIC_SIGNAL_COUNT] {
        &self.0
    }

    pub fn to_decimal_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub fn to_u256_array(&self) -> [U256; PUBLIC_SIGNAL_COUNT] {
        self.0.map(|f| f.as_u256())
    }

    pub fn commitment(&self) -> Commitment {
        Commitment::new(self.0[signal::COMMITMENT])
    }

    /// View key coordinates, as passed verbatim to recipient enrollment
    pub fn view_key_coordinates(&self) -> [FieldElement; 2] {
        [self.0[signal::VIEW_X], self.0[signal::VIEW_Y]]
    }

    /// Spend key coordinates, as passed verbatim to recipient enrollment
    pub fn spend_key_coordinates(&self) -> [FieldElement; 2] {
        [self.0[signal::SPEND_X], self.0[signal::SPEND_Y]]
    }

    /// Copy with one signal replaced
    pub fn with_signal(&self, index: usize, value: FieldElement) -> Self {
        let mut out = self.0;
        if let Some(slot) = out.get_mut(index) {
            *slot = value;
        }
        Self(out)
    }
}

// ============================================================================
// Witness
// ============================================================================

/// Named circuit inputs handed to a proving backend
///
/// Keys are the circuit signal names. A complete payment witness carries
/// the nine commitment inputs plus `commitment`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PaymentWitness {
    values: BTreeMap<String, FieldElement>,
}

impl PaymentWitness {
    /// Build a complete witness, computing the commitment from the inputs
    pub fn new(params: &PaymentParameters, view: &PublicKey, spend: &PublicKey) -> Result<Self> {
        let inputs = CommitmentInputs::new(params, view, spend)?;
        let commitment = inputs.hash()?;
        Ok(Self::from_inputs(&inputs, commitment))
    }

    pub fn from_inputs(inputs: &CommitmentInputs, commitment: Commitment) -> Self {
        let mut values: BTreeMap<String, FieldElement> =
            inputs.named().map(|(name, value)| (name.to_string(), value)).collect();
        values.insert(COMMITMENT_SIGNAL.to_string(), commitment.as_field());
        Self { values }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldElement) {
        self.values.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldElement> {
        self.values.remove(name)
    }

    /// Fails with `Witness` naming `name` if it is absent
    pub fn require(&self, name: &str) -> Result<FieldElement> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| PayrollError::Witness(name.to_string()))
    }

    /// Check every circuit input is present
    pub fn validate(&self) -> Result<()> {
        for name in COMMITMENT_INPUT_NAMES.iter().chain(std::iter::once(&COMMITMENT_SIGNAL)) {
            self.require(name)?;
        }
        Ok(())
    }

    pub fn commitment(&self) -> Result<Commitment> {
        self.require(COMMITMENT_SIGNAL).map(Commitment::new)
    }

    /// Public signals this witness must produce, in signal order
    pub fn expected_public_signals(&self) -> Result<PublicSignals> {
        let mut out = [FieldElement::ZERO; PUBLIC_SIGNAL_COUNT];
        for (slot, name) in out.iter_mut().zip(PUBLIC_SIGNAL_NAMES) {
            *slot = self.require(name)?;
        }
        Ok(PublicSignals(out))
    }

    /// circom input JSON: every signal as a decimal string
    pub fn to_circom_input(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::String(value.to_string())))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl fmt::Debug for PaymentWitness {
    // private inputs stay out of logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentWitness")
            .field("signals", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}
