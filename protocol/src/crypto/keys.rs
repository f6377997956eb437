//! Key management for payroll identities
//!
//! Every identity holds two independent secp256k1 key pairs:
//! - a *viewing* pair, used to detect and derive incoming payments
//! - a *spending* pair, combined with a per-payment offset to move funds
//!
//! Security:
//! - Secret scalars zeroize on drop (`k256::SecretKey` wipes itself)
//! - `IdentityKeys` is deliberately not `Clone`
//! - `Debug` output never includes secret material

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{keccak256, Address, U256};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use super::field::FieldElement;
use crate::error::{PayrollError, Result};

/// Upper bound on rejection-sampling rounds for circuit-compatible keys.
/// A uniform key fits with probability ~1/28, so this never trips in practice.
const MAX_CIRCUIT_KEY_ATTEMPTS: usize = 4096;

const VIEW_KEY_DOMAIN: &[u8] = b"stealth-payroll/view";
const SPEND_KEY_DOMAIN: &[u8] = b"stealth-payroll/spend";

/// Prefix of the shareable two-key meta-address
pub const META_ADDRESS_PREFIX: &str = "st:eth:0x";

// ============================================================================
// Key Pair
// ============================================================================

/// A secp256k1 key pair
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a key pair from the OS CSPRNG
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate a key pair from the given RNG.
    ///
    /// Fails with `KeyGeneration` if the RNG cannot produce bytes.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; 32]);
        loop {
            rng.try_fill_bytes(&mut bytes[..])
                .map_err(|e| PayrollError::KeyGeneration(format!("RNG unavailable: {e}")))?;
            // zero and values >= n are rejected; resample
            if let Ok(secret) = SecretKey::from_slice(&bytes[..]) {
                return Ok(Self::from_secret_key(secret));
            }
        }
    }

    /// Generate a key pair whose public coordinates both fit the proving field
    pub fn generate_circuit_compatible() -> Result<Self> {
        Self::generate_circuit_compatible_with_rng(&mut OsRng)
    }

    pub fn generate_circuit_compatible_with_rng<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<Self> {
        for _ in 0..MAX_CIRCUIT_KEY_ATTEMPTS {
            let pair = Self::generate_with_rng(rng)?;
            if pair.field_coordinates().is_ok() {
                return Ok(pair);
            }
        }
        Err(PayrollError::KeyGeneration(
            "no circuit-compatible key found within sampling bound".into(),
        ))
    }

    pub fn from_secret_key(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Rebuild a key pair from a stored 32-byte big-endian scalar
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| PayrollError::KeyFormat("secret scalar is zero or not below n".into()))?;
        Ok(Self::from_secret_key(secret))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Secret scalar bytes (for encrypted storage)
    ///
    /// WARNING: Handle these bytes with extreme care!
    pub fn export_secret(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes().into())
    }

    /// 65-byte SEC1 uncompressed public key (`0x04 || X || Y`)
    pub fn uncompressed_public_key(&self) -> [u8; 65] {
        uncompressed_bytes(&self.public)
    }

    pub fn address(&self) -> Address {
        address_from_public_key(&self.public)
    }

    pub fn field_coordinates(&self) -> Result<KeyCoordinates> {
        to_field_coordinates(&self.uncompressed_public_key())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &public_key_hex(&self.public))
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Field Coordinates
// ============================================================================

/// Affine coordinates of a public key, as proving-field elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCoordinates {
    pub x: FieldElement,
    pub y: FieldElement,
}

/// Split an uncompressed public key into its X and Y coordinates.
///
/// Fails with `KeyFormat` unless `public_key` is 65 bytes, starts with
/// `0x04` and lies on the curve, and with `FieldOverflow` if either
/// coordinate does not fit the BN254 scalar field.
pub fn to_field_coordinates(public_key: &[u8]) -> Result<KeyCoordinates> {
    if public_key.len() != 65 {
        return Err(PayrollError::KeyFormat(format!(
            "expected 65-byte uncompressed key, got {} bytes",
            public_key.len()
        )));
    }
    if public_key[0] != 0x04 {
        return Err(PayrollError::KeyFormat(format!(
            "expected uncompressed tag 0x04, got 0x{:02x}",
            public_key[0]
        )));
    }
    PublicKey::from_sec1_bytes(public_key)
        .map_err(|_| PayrollError::KeyFormat("point is not on secp256k1".into()))?;

    let x = U256::from_be_slice(&public_key[1..33]);
    let y = U256::from_be_slice(&public_key[33..65]);
    Ok(KeyCoordinates {
        x: FieldElement::new(x, "public key x")?,
        y: FieldElement::new(y, "public key y")?,
    })
}

/// Field coordinates of a parsed public key
pub fn public_key_coordinates(public_key: &PublicKey) -> Result<KeyCoordinates> {
    to_field_coordinates(&uncompressed_bytes(public_key))
}

// ============================================================================
// Encoding Helpers
// ============================================================================

pub fn uncompressed_bytes(public_key: &PublicKey) -> [u8; 65] {
    let point = public_key.to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(point.as_bytes());
    out
}

/// `0x04…` hex form of a public key
pub fn public_key_hex(public_key: &PublicKey) -> String {
    format!("0x{}", hex::encode(uncompressed_bytes(public_key)))
}

/// Parse a SEC1 public key from hex, with or without `0x`
pub fn parse_public_key(s: &str) -> Result<PublicKey> {
    let s = s.trim();
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| PayrollError::KeyFormat(format!("invalid hex: {e}")))?;
    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|_| PayrollError::KeyFormat("not a valid secp256k1 public key".into()))
}

/// Ethereum address: last 20 bytes of keccak256 over the raw 64-byte key
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let encoded = uncompressed_bytes(public_key);
    let hash = keccak256(&encoded[1..]);
    Address::from_slice(&hash[12..])
}

// ============================================================================
// Identity Keys
// ============================================================================

/// Complete key set for a payroll recipient
///
/// Clone is NOT implemented to prevent accidental secret duplication.
#[derive(Debug)]
pub struct IdentityKeys {
    pub viewing: KeyPair,
    pub spending: KeyPair,
}

impl IdentityKeys {
    pub fn generate() -> Result<Self> {
        Ok(Self {
            viewing: KeyPair::generate()?,
            spending: KeyPair::generate()?,
        })
    }

    /// Generate keys whose public coordinates can always be committed
    pub fn generate_circuit_compatible() -> Result<Self> {
        Ok(Self {
            viewing: KeyPair::generate_circuit_compatible()?,
            spending: KeyPair::generate_circuit_compatible()?,
        })
    }

    /// Reconstruct keys from stored secrets
    pub fn from_secrets(view_secret: &[u8; 32], spend_secret: &[u8; 32]) -> Result<Self> {
        Ok(Self {
            viewing: KeyPair::from_secret_bytes(view_secret)?,
            spending: KeyPair::from_secret_bytes(spend_secret)?,
        })
    }

    /// Derive keys from a BIP-39 mnemonic phrase
    ///
    /// Derivation, for the first counter `i` (u32, big-endian) whose public
    /// key fits the proving field:
    /// - view_secret = SHA256("stealth-payroll/view" || seed || i)
    /// - spend_secret = SHA256("stealth-payroll/spend" || seed || i)
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self> {
        let mnemonic = bip39::Mnemonic::parse(phrase)
            .map_err(|e| PayrollError::KeyGeneration(format!("invalid mnemonic: {e}")))?;
        let seed = Zeroizing::new(mnemonic.to_seed(passphrase));

        let viewing = derive_from_seed(VIEW_KEY_DOMAIN, &seed[..])?;
        let spending = derive_from_seed(SPEND_KEY_DOMAIN, &seed[..])?;
        Ok(Self { viewing, spending })
    }

    /// Generate a new 24-word mnemonic and derive keys from it
    pub fn generate_with_mnemonic() -> Result<(Self, String)> {
        let mut entropy = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut entropy)
            .map_err(|e| PayrollError::KeyGeneration(format!("RNG unavailable: {e}")))?;

        let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
            .map_err(|e| PayrollError::KeyGeneration(format!("mnemonic generation failed: {e}")));
        entropy.zeroize();

        let phrase = mnemonic?.to_string();
        let keys = Self::from_mnemonic(&phrase, "")?;
        Ok((keys, phrase))
    }

    pub fn meta_address(&self) -> MetaAddress {
        MetaAddress {
            view: *self.viewing.public_key(),
            spend: *self.spending.public_key(),
        }
    }

    /// Export secrets as bytes (for encrypted storage)
    pub fn export_secrets(&self) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
        (self.viewing.export_secret(), self.spending.export_secret())
    }
}

fn derive_from_seed(domain: &[u8], seed: &[u8]) -> Result<KeyPair> {
    for counter in 0..MAX_CIRCUIT_KEY_ATTEMPTS as u32 {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        let mut bytes: [u8; 32] = hasher.finalize().into();

        let secret = SecretKey::from_slice(&bytes);
        bytes.zeroize();
        if let Ok(secret) = secret {
            let pair = KeyPair::from_secret_key(secret);
            if pair.field_coordinates().is_ok() {
                return Ok(pair);
            }
        }
    }
    Err(PayrollError::KeyGeneration(
        "no circuit-compatible key derivable from seed".into(),
    ))
}

// ============================================================================
// Meta-Address
// ============================================================================

/// A recipient's two public keys in shareable form
///
/// Text form: `st:eth:0x` followed by the compressed view key and the
/// compressed spend key (33 bytes each).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaAddress {
    pub view: PublicKey,
    pub spend: PublicKey,
}

impl fmt::Display for MetaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.view.to_encoded_point(true);
        let spend = self.spend.to_encoded_point(true);
        write!(
            f,
            "{META_ADDRESS_PREFIX}{}{}",
            hex::encode(view.as_bytes()),
            hex::encode(spend.as_bytes())
        )
    }
}

impl FromStr for MetaAddress {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .trim()
            .strip_prefix(META_ADDRESS_PREFIX)
            .ok_or_else(|| PayrollError::KeyFormat(format!("meta-address must start with {META_ADDRESS_PREFIX}")))?;
        let bytes = hex::decode(body)
            .map_err(|e| PayrollError::KeyFormat(format!("invalid meta-address hex: {e}")))?;
        if bytes.len() != 66 {
            return Err(PayrollError::KeyFormat(format!(
                "meta-address must carry 66 bytes, got {}",
                bytes.len()
            )));
        }
        let view = PublicKey::from_sec1_bytes(&bytes[..33])
            .map_err(|_| PayrollError::KeyFormat("invalid view key in meta-address".into()))?;
        let spend = PublicKey::from_sec1_bytes(&bytes[33..])
            .map_err(|_| PayrollError::KeyFormat("invalid spend key in meta-address".into()))?;
        Ok(Self { view, spend })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_differ() {
        let keys = IdentityKeys::generate().unwrap();
        assert_ne!(keys.viewing.public_key(), keys.spending.public_key());
    }

    #[test]
    fn test_secret_roundtrip() {
        let keys = IdentityKeys::generate().unwrap();
        let (view, spend) = keys.export_secrets();
        let restored = IdentityKeys::from_secrets(&view, &spend).unwrap();
        assert_eq!(restored.meta_address(), keys.meta_address());
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(matches!(
            KeyPair::from_secret_bytes(&[0u8; 32]),
            Err(PayrollError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_secret_error_is_not_called_public() {
        let message = KeyPair::from_secret_bytes(&[0xff; 32]).unwrap_err().to_string();
        assert!(message.starts_with("invalid key:"));
        assert!(!message.contains("public"));
    }

    #[test]
    fn test_coordinates_reject_bad_length_and_tag() {
        let pair = KeyPair::generate().unwrap();
        let encoded = pair.uncompressed_public_key();

        assert!(matches!(to_field_coordinates(&encoded[..64]), Err(PayrollError::KeyFormat(_))));

        let compressed = pair.public_key().to_encoded_point(true);
        assert!(matches!(
            to_field_coordinates(compressed.as_bytes()),
            Err(PayrollError::KeyFormat(_))
        ));

        let mut off_curve = encoded;
        off_curve[64] ^= 1;
        assert!(matches!(to_field_coordinates(&off_curve), Err(PayrollError::KeyFormat(_))));
    }

    #[test]
    fn test_circuit_compatible_keys_fit_field() {
        let keys = IdentityKeys::generate_circuit_compatible().unwrap();
        assert!(keys.viewing.field_coordinates().is_ok());
        assert!(keys.spending.field_coordinates().is_ok());
    }

    #[test]
    fn test_meta_address_roundtrip() {
        let keys = IdentityKeys::generate().unwrap();
        let meta = keys.meta_address();
        let text = meta.to_string();
        assert!(text.starts_with(META_ADDRESS_PREFIX));
        assert_eq!(text.len(), META_ADDRESS_PREFIX.len() + 132);
        assert_eq!(text.parse::<MetaAddress>().unwrap(), meta);

        assert!("st:sol:0x00".parse::<MetaAddress>().is_err());
    }

    #[test]
    fn test_mnemonic_is_deterministic() {
        let (keys, phrase) = IdentityKeys::generate_with_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);

        let again = IdentityKeys::from_mnemonic(&phrase, "").unwrap();
        assert_eq!(again.meta_address(), keys.meta_address());
        assert!(keys.viewing.field_coordinates().is_ok());
        assert!(keys.spending.field_coordinates().is_ok());

        let other = IdentityKeys::from_mnemonic(&phrase, "passphrase").unwrap();
        assert_ne!(other.meta_address(), keys.meta_address());
    }

    #[test]
    fn test_debug_is_redacted() {
        let pair = KeyPair::generate().unwrap();
        let secret_hex = hex::encode(&pair.export_secret()[..]);
        let debug = format!("{:?}", pair);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&secret_hex));
    }
}
