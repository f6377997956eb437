//! Pinned test vectors
//!
//! Values were computed independently (Keccak-256, secp256k1 and the
//! circom Poseidon constants) and pin the exact bytes other parties see:
//! key coordinates sent to enrollment, the commitment the circuit checks,
//! and the stealth address a recipient must rederive.
//!
//! Keys are the reference payroll keys nudged forward to the first scalar
//! whose public key fits the BN254 scalar field.

#[cfg(test)]
mod payroll_test_vectors {
    use alloy::primitives::{address, b256, U256};

    use crate::crypto::field::FieldElement;
    use crate::crypto::keys::{to_field_coordinates, uncompressed_bytes, IdentityKeys, KeyPair};
    use crate::crypto::poseidon::{build_commitment, PaymentParameters, SecretNonce};
    use crate::crypto::stealth::StealthAddressProtocol;
    use crate::error::PayrollError;

    const VIEW_SECRET: [u8; 32] =
        b256!("0x123456789012345678901234567890123456789012345678901234567890124a").0;
    const SPEND_SECRET: [u8; 32] =
        b256!("0xabcdefabcdefabcdefabcdefabcdefabcdefabcdefabcdefabcdefabcdefac04").0;
    const EPHEMERAL_SECRET: [u8; 32] =
        b256!("0x0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20").0;

    fn keys() -> IdentityKeys {
        IdentityKeys::from_secrets(&VIEW_SECRET, &SPEND_SECRET).unwrap()
    }

    fn reference_params(amount: u64) -> PaymentParameters {
        PaymentParameters {
            amount: U256::from(amount),
            secret_nonce: SecretNonce::from_decimal("999888777").unwrap(),
            payment_type: 2,
            start_date: 1_700_000_000,
            end_date: 1_702_592_000,
        }
    }

    fn decimal(s: &str) -> FieldElement {
        FieldElement::from_decimal(s, "vector").unwrap()
    }

    // ==================== Key Vectors ====================

    /// Test Vector 1: view key coordinates and address
    #[test]
    fn test_vector_1_view_key() {
        let keys = keys();
        let coords = keys.viewing.field_coordinates().unwrap();

        assert_eq!(
            coords.x,
            decimal("4178174794538738040567597491452478967128737098647987197742705323176204713782")
        );
        assert_eq!(
            coords.y,
            decimal("6787840150649645986734433259635895200883972850680136265518639748879930425531")
        );
        assert_eq!(keys.viewing.address(), address!("44aa5f983f412620927b757ab42a42149a4ec660"));
    }

    /// Test Vector 2: spend key coordinates and address
    #[test]
    fn test_vector_2_spend_key() {
        let keys = keys();
        let coords = keys.spending.field_coordinates().unwrap();

        assert_eq!(
            coords.x,
            decimal("10326957622098166519356092102239718310155805008286995093495180664975028576029")
        );
        assert_eq!(
            coords.y,
            decimal("1354541141303704063259123249638005442372278472021291810258463354978080386759")
        );
        assert_eq!(keys.spending.address(), address!("0c35f893f04dcebd2a1beb83dec807bc73241298"));
    }

    /// Test Vector 3: the unadjusted reference view key has an X coordinate
    /// above the BN254 modulus and cannot be committed
    #[test]
    fn test_vector_3_reference_key_overflows_field() {
        let secret = b256!("0x1234567890123456789012345678901234567890123456789012345678901234").0;
        let pair = KeyPair::from_secret_bytes(&secret).unwrap();

        let err = to_field_coordinates(&pair.uncompressed_public_key()).unwrap_err();
        assert!(matches!(err, PayrollError::FieldOverflow { field: "public key x" }));
    }

    // ==================== Commitment Vectors ====================

    /// Test Vector 4: reference payment commitment
    #[test]
    fn test_vector_4_reference_commitment() {
        let keys = keys();
        let commitment = build_commitment(
            &reference_params(1000),
            keys.viewing.public_key(),
            keys.spending.public_key(),
        )
        .unwrap();

        assert_eq!(
            commitment.to_string(),
            "7549250993499029929434323172176276280253612586431187349696562307819812647955"
        );
        assert_eq!(
            commitment.to_b256(),
            b256!("0x10b0b9822e83b6951688832a9367675f540610cbc2a4f6c831dccc38e95b7413")
        );
    }

    /// Test Vector 5: amount + 1 gives an unrelated commitment
    #[test]
    fn test_vector_5_amount_changes_commitment() {
        let keys = keys();
        let commitment = build_commitment(
            &reference_params(1001),
            keys.viewing.public_key(),
            keys.spending.public_key(),
        )
        .unwrap();

        assert_eq!(
            commitment.to_string(),
            "16894759000085905191678456756304836594346691067830747000116449070539677439971"
        );
    }

    // ==================== Stealth Vectors ====================

    /// Test Vector 6: sender side with a fixed ephemeral key
    #[test]
    fn test_vector_6_stealth_generation() {
        let keys = keys();
        let ephemeral = KeyPair::from_secret_bytes(&EPHEMERAL_SECRET).unwrap();

        let stealth = StealthAddressProtocol::default()
            .generate_stealth_address_with_ephemeral(
                ephemeral.secret_key(),
                keys.viewing.public_key(),
                keys.spending.public_key(),
            )
            .unwrap();

        assert_eq!(
            hex::encode(uncompressed_bytes(&stealth.ephemeral_public_key)),
            "0484bf7562262bbd6940085748f3be6afa52ae317155181ece31b66351ccffa4b0\
             8cc43d63b2859d469fee15f31c9edb5324266e6fd0407e87382d60fc4511acd8"
        );
        assert_eq!(
            hex::encode(uncompressed_bytes(&stealth.stealth_public_key)),
            "04430cd011b68d878c0678ded7cad6c23cef96ef0acba284224c384079c72fc3c0\
             82a5ff79f088f6d73f83d03a291c7d611b92faeccf2ea0a79122756979d98af4"
        );
        assert_eq!(stealth.stealth_address, address!("fb64f67557dc447168da8c0ed8d347437cf95310"));
    }

    /// Test Vector 7: recipient side recovers the matching private key
    #[test]
    fn test_vector_7_stealth_recovery() {
        let keys = keys();
        let ephemeral = KeyPair::from_secret_bytes(&EPHEMERAL_SECRET).unwrap();

        let recovered = StealthAddressProtocol::default()
            .recover_stealth_private_key(
                keys.viewing.secret_key(),
                keys.spending.secret_key(),
                ephemeral.public_key(),
                &address!("fb64f67557dc447168da8c0ed8d347437cf95310"),
            )
            .unwrap();

        assert_eq!(
            *recovered.secret_bytes(),
            b256!("0x60830a01202a3d4da1b473badea8b7099cb0e2ffce149a735db4594c60fa6d46").0
        );
    }

    /// Test Vector 8: swapping the two keys of the recipient breaks recovery
    #[test]
    fn test_vector_8_swapped_keys_mismatch() {
        let keys = keys();
        let ephemeral = KeyPair::from_secret_bytes(&EPHEMERAL_SECRET).unwrap();

        let err = StealthAddressProtocol::default()
            .recover_stealth_private_key(
                keys.spending.secret_key(),
                keys.viewing.secret_key(),
                ephemeral.public_key(),
                &address!("fb64f67557dc447168da8c0ed8d347437cf95310"),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            PayrollError::StealthDerivationMismatch { expected, .. }
                if expected == address!("fb64f67557dc447168da8c0ed8d347437cf95310")
        ));
        // the message names addresses only
        let message = err.to_string();
        assert!(!message.contains("60830a01"));
        assert!(!message.to_lowercase().contains("abcdefabcdef"));
    }
}
