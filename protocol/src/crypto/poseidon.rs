//! Payment commitments
//!
//! commitment = Poseidon(amount, secretNonce, viewX, viewY, spendX, spendY,
//!                       paymentType, startDate, endDate)
//!
//! Poseidon is the circom-compatible BN254 instance (x^5 S-box, width 10),
//! so the value matches what the payment circuit computes in-circuit. The
//! input order is part of the wire protocol: changing it is a protocol
//! version change.

use std::fmt;

use alloy::primitives::{B256, U256};
use ark_bn254::Fr;
use k256::PublicKey;
use light_poseidon::{Poseidon, PoseidonHasher};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use super::field::{self, FieldElement};
use super::keys::{public_key_coordinates, KeyCoordinates};
use crate::error::{PayrollError, Result};

/// Number of ordered commitment inputs
pub const COMMITMENT_ARITY: usize = 9;

/// Circuit signal names, in commitment order
pub const COMMITMENT_INPUT_NAMES: [&str; COMMITMENT_ARITY] = [
    "amount",
    "secretNonce",
    "pubViewKeyX",
    "pubViewKeyY",
    "pubSpendKeyX",
    "pubSpendKeyY",
    "paymentType",
    "startDate",
    "endDate",
];

pub const ONE_TIME_PAYMENT: u64 = 1;
pub const RECURRING_PAYMENT: u64 = 2;

/// Length of one recurring pay period
pub const RECURRING_PERIOD_SECS: u64 = 30 * 24 * 60 * 60;

/// Random nonces are 128-bit
const NONCE_BYTES: usize = 16;

// ============================================================================
// Secret Nonce
// ============================================================================

/// Per-payment blinding value; zeroized on drop
#[derive(Clone, PartialEq, Eq)]
pub struct SecretNonce {
    bytes: [u8; 32],
}

impl SecretNonce {
    /// Fresh 128-bit nonce from the OS CSPRNG
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes[32 - NONCE_BYTES..]);
        Self { bytes }
    }

    pub fn new(value: U256) -> Result<Self> {
        let value = FieldElement::new(value, "secretNonce")?;
        Ok(Self { bytes: value.as_u256().to_be_bytes() })
    }

    pub fn from_decimal(s: &str) -> Result<Self> {
        let value = FieldElement::from_decimal(s, "secretNonce")?;
        Self::new(value.as_u256())
    }

    pub fn value(&self) -> U256 {
        U256::from_be_bytes(self.bytes)
    }
}

impl Drop for SecretNonce {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for SecretNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretNonce(<redacted>)")
    }
}

impl Serialize for SecretNonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.value())
    }
}

impl<'de> Deserialize<'de> for SecretNonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_decimal(&s).map_err(de::Error::custom)
    }
}

// ============================================================================
// Payment Parameters
// ============================================================================

/// Parameters of a single payment; immutable once committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentParameters {
    #[serde(with = "field::decimal")]
    pub amount: U256,
    pub secret_nonce: SecretNonce,
    pub payment_type: u64,
    pub start_date: u64,
    pub end_date: u64,
}

impl PaymentParameters {
    /// A recurring payment covering one period from `start_date`, with a fresh nonce
    pub fn recurring_from(amount: U256, start_date: u64) -> Self {
        Self {
            amount,
            secret_nonce: SecretNonce::random(),
            payment_type: RECURRING_PAYMENT,
            start_date,
            end_date: start_date.saturating_add(RECURRING_PERIOD_SECS),
        }
    }
}

// ============================================================================
// Commitment Inputs
// ============================================================================

/// The nine commitment inputs, in wire order
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CommitmentInputs([FieldElement; COMMITMENT_ARITY]);

impl CommitmentInputs {
    /// Convert parameters and both public keys to field elements.
    ///
    /// Fails with `FieldOverflow` naming the first input that does not fit,
    /// or `KeyFormat` if a key cannot be split into coordinates.
    pub fn new(params: &PaymentParameters, view: &PublicKey, spend: &PublicKey) -> Result<Self> {
        let amount = FieldElement::new(params.amount, "amount")?;
        let nonce = FieldElement::new(params.secret_nonce.value(), "secretNonce")?;
        let view = coordinates(view, ["pubViewKeyX", "pubViewKeyY"])?;
        let spend = coordinates(spend, ["pubSpendKeyX", "pubSpendKeyY"])?;

        Ok(Self([
            amount,
            nonce,
            view.x,
            view.y,
            spend.x,
            spend.y,
            FieldElement::from_u64(params.payment_type),
            FieldElement::from_u64(params.start_date),
            FieldElement::from_u64(params.end_date),
        ]))
    }

    pub fn as_array(&self) -> &[FieldElement; COMMITMENT_ARITY] {
        &self.0
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, FieldElement)> + '_ {
        COMMITMENT_INPUT_NAMES.iter().copied().zip(self.0.iter().copied())
    }

    pub fn hash(&self) -> Result<Commitment> {
        poseidon_hash(&self.0).map(Commitment)
    }
}

impl fmt::Debug for CommitmentInputs {
    // the amount and nonce are private witness values
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitmentInputs")
            .field("amount", &"<redacted>")
            .field("secretNonce", &"<redacted>")
            .field("public", &&self.0[2..])
            .finish()
    }
}

/// Key coordinates with overflow errors naming the circuit signal
fn coordinates(key: &PublicKey, names: [&'static str; 2]) -> Result<KeyCoordinates> {
    public_key_coordinates(key).map_err(|err| match err {
        PayrollError::FieldOverflow { field: "public key x" } => {
            PayrollError::FieldOverflow { field: names[0] }
        }
        PayrollError::FieldOverflow { .. } => PayrollError::FieldOverflow { field: names[1] },
        other => other,
    })
}

// ============================================================================
// Commitment
// ============================================================================

/// A payment commitment: one BN254 scalar field element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(FieldElement);

impl Commitment {
    pub fn new(value: FieldElement) -> Self {
        Self(value)
    }

    pub fn as_field(&self) -> FieldElement {
        self.0
    }

    pub fn as_u256(&self) -> U256 {
        self.0.as_u256()
    }

    /// 32-byte big-endian form used as a storage key
    pub fn to_b256(&self) -> B256 {
        B256::from(self.0.as_u256())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for Commitment {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let value = match s.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16)
                .map_err(|_| PayrollError::FieldOverflow { field: "commitment" })?,
            None => U256::from_str_radix(s, 10)
                .map_err(|_| PayrollError::FieldOverflow { field: "commitment" })?,
        };
        Ok(Self(FieldElement::new(value, "commitment")?))
    }
}

/// Build the commitment for a payment to the holder of `view` / `spend`
pub fn build_commitment(
    params: &PaymentParameters,
    view: &PublicKey,
    spend: &PublicKey,
) -> Result<Commitment> {
    CommitmentInputs::new(params, view, spend)?.hash()
}

/// circom-compatible Poseidon over 1..=12 field elements
pub fn poseidon_hash(inputs: &[FieldElement]) -> Result<FieldElement> {
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())
        .map_err(|e| PayrollError::Poseidon(e.to_string()))?;
    let elements: Vec<Fr> = inputs.iter().map(FieldElement::to_ark).collect();
    let hash = hasher
        .hash(&elements)
        .map_err(|e| PayrollError::Poseidon(e.to_string()))?;
    Ok(FieldElement::from_ark(&hash))
}
