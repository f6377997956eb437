//! Dual-key stealth addresses over secp256k1
//!
//! Sender (knows the recipient's view key V and spend key B):
//! 1. Draw an ephemeral key pair (e, E = e·G)
//! 2. s = ECDH(e, V), the uncompressed shared point
//! 3. c = keccak256(s) mod n
//! 4. P = c·G + B
//! 5. address = keccak256(P)[12..]
//!
//! Recipient (knows v and b): s' = ECDH(v, E), c' = keccak256(s') mod n,
//! p = c' + b mod n. Then p·G = P, so the address derived from p must be
//! the published one. Anything else is a mismatch and is never ignored.

use std::fmt;

use alloy::primitives::{keccak256, Address};
use k256::elliptic_curve::ops::Reduce;
use k256::{FieldBytes, NonZeroScalar, PublicKey, Scalar, SecretKey, U256};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use super::curve::{CurveOps, Secp256k1, SharedSecret};
use super::keys::{address_from_public_key, KeyPair};
use crate::error::{PayrollError, Result};

/// One-time receiving address produced by the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StealthAddress {
    /// Published alongside the payment so the recipient can rederive `s`
    pub ephemeral_public_key: PublicKey,
    pub stealth_public_key: PublicKey,
    pub stealth_address: Address,
}

/// Private key of a stealth address, recovered by the recipient
pub struct RecoveredStealthKey {
    secret: SecretKey,
    address: Address,
}

impl RecoveredStealthKey {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Raw 32-byte scalar, e.g. for importing into a wallet
    ///
    /// WARNING: Handle these bytes with extreme care!
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes().into())
    }
}

impl fmt::Debug for RecoveredStealthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveredStealthKey")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Stealth address generation and recovery.
///
/// Stateless: every call is a function of its inputs plus, on the sender
/// side, a fresh ephemeral key.
#[derive(Debug, Clone)]
pub struct StealthAddressProtocol<C = Secp256k1> {
    curve: C,
}

impl Default for StealthAddressProtocol<Secp256k1> {
    fn default() -> Self {
        Self::new(Secp256k1)
    }
}

impl<C: CurveOps> StealthAddressProtocol<C> {
    pub fn new(curve: C) -> Self {
        Self { curve }
    }

    // ========================================================================
    // Sender side
    // ========================================================================

    /// Generate a stealth address with an ephemeral key from the OS CSPRNG
    pub fn generate_stealth_address(
        &self,
        view_public: &PublicKey,
        spend_public: &PublicKey,
    ) -> Result<StealthAddress> {
        self.generate_stealth_address_with_rng(&mut OsRng, view_public, spend_public)
    }

    pub fn generate_stealth_address_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        view_public: &PublicKey,
        spend_public: &PublicKey,
    ) -> Result<StealthAddress> {
        let ephemeral = KeyPair::generate_with_rng(rng)?;
        self.generate_stealth_address_with_ephemeral(ephemeral.secret_key(), view_public, spend_public)
    }

    /// Deterministic generation from a caller-chosen ephemeral secret.
    ///
    /// Reusing an ephemeral secret across payments links them; only use
    /// this for reproducible vectors.
    pub fn generate_stealth_address_with_ephemeral(
        &self,
        ephemeral_secret: &SecretKey,
        view_public: &PublicKey,
        spend_public: &PublicKey,
    ) -> Result<StealthAddress> {
        let shared = self.curve.shared_secret(ephemeral_secret, view_public)?;
        let offset = offset_scalar(&shared)?;

        let offset_point = PublicKey::from_secret_scalar(&offset);
        let stealth_public_key = self.curve.point_add(&offset_point, spend_public)?;
        let stealth_address = address_from_public_key(&stealth_public_key);

        debug!(%stealth_address, "derived stealth address");

        Ok(StealthAddress {
            ephemeral_public_key: ephemeral_secret.public_key(),
            stealth_public_key,
            stealth_address,
        })
    }

    // ========================================================================
    // Recipient side
    // ========================================================================

    /// Derive the stealth private key for a published ephemeral key
    /// without checking it against any address.
    pub fn derive_stealth_private_key(
        &self,
        view_secret: &SecretKey,
        spend_secret: &SecretKey,
        ephemeral_public_key: &PublicKey,
    ) -> Result<RecoveredStealthKey> {
        let shared = self.curve.shared_secret(view_secret, ephemeral_public_key)?;
        let offset = offset_scalar(&shared)?;

        // p = c + b mod n
        let sum: Scalar = *offset + *spend_secret.to_nonzero_scalar();
        let scalar = Option::<NonZeroScalar>::from(NonZeroScalar::new(sum))
            .ok_or(PayrollError::CurveOperation("stealth key derivation"))?;
        let secret = SecretKey::from(scalar);
        let address = address_from_public_key(&secret.public_key());

        Ok(RecoveredStealthKey { secret, address })
    }

    /// Recover the private key of `published_address`.
    ///
    /// Fails with `StealthDerivationMismatch` when the derived address
    /// differs, which means wrong keys or a forged ephemeral key.
    pub fn recover_stealth_private_key(
        &self,
        view_secret: &SecretKey,
        spend_secret: &SecretKey,
        ephemeral_public_key: &PublicKey,
        published_address: &Address,
    ) -> Result<RecoveredStealthKey> {
        let recovered = self.derive_stealth_private_key(view_secret, spend_secret, ephemeral_public_key)?;

        if !addresses_match(&recovered.address, published_address) {
            return Err(PayrollError::StealthDerivationMismatch {
                expected: *published_address,
                recovered: recovered.address,
            });
        }

        debug!(address = %recovered.address, "recovered stealth key");
        Ok(recovered)
    }

    /// View-key-only scan: does `address` belong to the holder of `spend_public`?
    ///
    /// Needs no spending key, so it can run on a watch-only device.
    pub fn is_payment_for(
        &self,
        view_secret: &SecretKey,
        spend_public: &PublicKey,
        ephemeral_public_key: &PublicKey,
        address: &Address,
    ) -> Result<bool> {
        let shared = self.curve.shared_secret(view_secret, ephemeral_public_key)?;
        let offset = offset_scalar(&shared)?;
        let expected = self
            .curve
            .point_add(&PublicKey::from_secret_scalar(&offset), spend_public)?;
        Ok(addresses_match(&address_from_public_key(&expected), address))
    }
}

/// c = keccak256(s) mod n
fn offset_scalar(shared: &SharedSecret) -> Result<NonZeroScalar> {
    let digest = keccak256(&shared[..]);
    let reduced = <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::clone_from_slice(digest.as_slice()));
    Option::<NonZeroScalar>::from(NonZeroScalar::new(reduced))
        .ok_or(PayrollError::CurveOperation("offset derivation"))
}

fn addresses_match(a: &Address, b: &Address) -> bool {
    a.as_slice().ct_eq(b.as_slice()).into()
}
