//! BN254 field elements as exchanged with the proving system
//!
//! Values cross the proving boundary as decimal strings (the snarkjs and
//! circom convention) and the contract boundary as `uint256`. Two bounded
//! wrappers keep both representations honest:
//! - [`FieldElement`]: below the scalar modulus `r` (circuit signals)
//! - [`Coordinate`]: below the base modulus `q` (proof curve points)

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{uint, U256};
use ark_bn254::{Fq, Fr};
use ark_ff::{BigInt, PrimeField};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PayrollError, Result};

/// BN254 scalar field modulus `r`
pub const BN254_SCALAR_MODULUS: U256 = uint!(
    21888242871839275222246405745257275088548364400416034343698204186575808495617_U256
);

/// BN254 base field modulus `q`
pub const BN254_BASE_MODULUS: U256 = uint!(
    21888242871839275222246405745257275088696311157297823662689037894645226208583_U256
);

macro_rules! bounded_field {
    ($(#[$meta:meta])* $name:ident, $modulus:expr, $ark:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(U256);

        impl $name {
            pub const ZERO: Self = Self(U256::ZERO);

            /// Wrap `value`, rejecting anything at or above the modulus.
            /// `field` names the offending input in the error.
            pub fn new(value: U256, field: &'static str) -> Result<Self> {
                if value >= $modulus {
                    return Err(PayrollError::FieldOverflow { field });
                }
                Ok(Self(value))
            }

            pub fn from_u64(value: u64) -> Self {
                Self(U256::from(value))
            }

            pub fn from_decimal(s: &str, field: &'static str) -> Result<Self> {
                let value = U256::from_str_radix(s.trim(), 10)
                    .map_err(|_| PayrollError::FieldOverflow { field })?;
                Self::new(value, field)
            }

            pub fn as_u256(&self) -> U256 {
                self.0
            }

            pub fn to_ark(&self) -> $ark {
                // always in range, so from_bigint cannot return None
                <$ark>::from_bigint(BigInt::new(*self.0.as_limbs())).unwrap_or_default()
            }

            pub fn from_ark(value: &$ark) -> Self {
                Self(U256::from_limbs(value.into_bigint().0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl FromStr for $name {
            type Err = PayrollError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_decimal(s, stringify!($name))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

bounded_field!(
    /// An element of the BN254 scalar field; every circuit signal is one
    FieldElement,
    BN254_SCALAR_MODULUS,
    Fr
);

bounded_field!(
    /// An element of the BN254 base field; proof point coordinates are these
    Coordinate,
    BN254_BASE_MODULUS,
    Fq
);

/// Serde adapter writing a `U256` as a decimal string
pub mod decimal {
    use alloy::primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(s.trim(), 10).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulus_is_rejected() {
        assert!(FieldElement::new(BN254_SCALAR_MODULUS - U256::from(1), "x").is_ok());
        assert!(matches!(
            FieldElement::new(BN254_SCALAR_MODULUS, "amount"),
            Err(PayrollError::FieldOverflow { field: "amount" })
        ));
        // q > r, so values in [r, q) are coordinates but not signals
        assert!(Coordinate::new(BN254_SCALAR_MODULUS, "x").is_ok());
        assert!(Coordinate::new(BN254_BASE_MODULUS, "x").is_err());
    }

    #[test]
    fn test_decimal_serde() {
        let fe = FieldElement::from_u64(1_700_000_000);
        let json = serde_json::to_string(&fe).unwrap();
        assert_eq!(json, "\"1700000000\"");
        let back: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fe);

        let too_big = format!("\"{}\"", BN254_SCALAR_MODULUS);
        assert!(serde_json::from_str::<FieldElement>(&too_big).is_err());
    }

    #[test]
    fn test_ark_conversion_preserves_value() {
        let fe = FieldElement::from_decimal("999888777", "nonce").unwrap();
        assert_eq!(fe.to_ark(), Fr::from(999_888_777u64));
        assert_eq!(FieldElement::from_ark(&fe.to_ark()), fe);

        let max = FieldElement::new(BN254_SCALAR_MODULUS - U256::from(1), "x").unwrap();
        assert_eq!(max.to_ark(), -Fr::from(1u64));
    }
}
