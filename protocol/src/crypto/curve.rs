//! Elliptic-curve primitives the stealth protocol is built on
//!
//! The protocol only ever needs two operations, so the curve library sits
//! behind [`CurveOps`] and can be swapped without touching protocol logic.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{ProjectivePoint, PublicKey, SecretKey};
use zeroize::Zeroizing;

use crate::error::{PayrollError, Result};

/// Length of an uncompressed SEC1 point, the shared-secret encoding
pub const SHARED_SECRET_LEN: usize = 65;

pub type SharedSecret = Zeroizing<[u8; SHARED_SECRET_LEN]>;

pub trait CurveOps: Send + Sync {
    /// `P + Q`. Fails with `CurveOperation` if the sum is the point at infinity.
    fn point_add(&self, p: &PublicKey, q: &PublicKey) -> Result<PublicKey>;

    /// ECDH: the uncompressed encoding of `secret * public`
    fn shared_secret(&self, secret: &SecretKey, public: &PublicKey) -> Result<SharedSecret>;
}

/// secp256k1 via `k256`
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1;

impl CurveOps for Secp256k1 {
    fn point_add(&self, p: &PublicKey, q: &PublicKey) -> Result<PublicKey> {
        let sum = p.to_projective() + q.to_projective();
        if sum == ProjectivePoint::IDENTITY {
            return Err(PayrollError::CurveOperation("point addition"));
        }
        PublicKey::from_affine(sum.to_affine())
            .map_err(|_| PayrollError::CurveOperation("point addition"))
    }

    fn shared_secret(&self, secret: &SecretKey, public: &PublicKey) -> Result<SharedSecret> {
        let point = (public.to_projective() * *secret.to_nonzero_scalar()).to_affine();
        let encoded = point.to_encoded_point(false);
        // identity encodes as a single byte
        if encoded.len() != SHARED_SECRET_LEN {
            return Err(PayrollError::CurveOperation("shared secret"));
        }
        let mut out = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
        out.copy_from_slice(encoded.as_bytes());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_ecdh_is_symmetric() {
        let a = SecretKey::random(&mut OsRng);
        let b = SecretKey::random(&mut OsRng);
        let ab = Secp256k1.shared_secret(&a, &b.public_key()).unwrap();
        let ba = Secp256k1.shared_secret(&b, &a.public_key()).unwrap();
        assert_eq!(*ab, *ba);
        assert_eq!(ab[0], 0x04);
    }

    #[test]
    fn test_point_add_rejects_infinity() {
        let a = SecretKey::random(&mut OsRng).public_key();
        let neg = PublicKey::from_affine((-a.to_projective()).to_affine()).unwrap();
        assert!(matches!(
            Secp256k1.point_add(&a, &neg),
            Err(PayrollError::CurveOperation(_))
        ));
    }

    #[test]
    fn test_point_add_matches_scalar_sum() {
        let a = SecretKey::random(&mut OsRng);
        let b = SecretKey::random(&mut OsRng);
        let sum = Secp256k1.point_add(&a.public_key(), &b.public_key()).unwrap();

        let scalar = *a.to_nonzero_scalar() + *b.to_nonzero_scalar();
        let expected = (ProjectivePoint::GENERATOR * scalar).to_affine();
        assert_eq!(sum.as_affine(), &expected);
    }
}
