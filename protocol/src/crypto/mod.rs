//! Cryptographic primitives for private payroll
//!
//! - `keys`: viewing/spending key pairs and their field coordinates
//! - `field`: bounded BN254 field elements
//! - `poseidon`: payment commitments
//! - `curve`: point addition and ECDH behind a swappable interface
//! - `stealth`: one-time address generation and recovery

pub mod curve;
pub mod field;
pub mod keys;
pub mod poseidon;
pub mod stealth;

pub use curve::{CurveOps, Secp256k1};
pub use field::{Coordinate, FieldElement, BN254_BASE_MODULUS, BN254_SCALAR_MODULUS};
pub use keys::{
    address_from_public_key, parse_public_key, public_key_hex, to_field_coordinates,
    IdentityKeys, KeyCoordinates, KeyPair, MetaAddress,
};
pub use poseidon::{
    build_commitment, poseidon_hash, Commitment, CommitmentInputs, PaymentParameters,
    SecretNonce, COMMITMENT_ARITY, RECURRING_PAYMENT,
};
pub use stealth::{RecoveredStealthKey, StealthAddress, StealthAddressProtocol};
