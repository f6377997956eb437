//! Integration tests for the payroll protocol
//!
//! These tests run complete payments with real cryptography end to end:
//! - Keys → commitment → Groth16 proof → verification → stealth payment
//!   → discovery → key recovery → settlement record
//! - Tampered public signals and a missing `pB` swap are rejected
//! - Lifecycle ordering is enforced along the way

#[cfg(test)]
mod e2e_tests {
    use std::sync::OnceLock;

    use alloy::primitives::{address, b256, keccak256, U256};
    use rand::rngs::OsRng;

    use crate::crypto::field::FieldElement;
    use crate::crypto::keys::{IdentityKeys, KeyPair};
    use crate::crypto::poseidon::{build_commitment, PaymentParameters, SecretNonce};
    use crate::crypto::stealth::StealthAddressProtocol;
    use crate::error::{PayrollError, Phase};
    use crate::ledger::{InMemoryLedger, JsonFileLedger, RecordOutcome, SettlementLedger};
    use crate::lifecycle::{PaymentLifecycle, PaymentStage};
    use crate::zk::arkworks::{ArkworksProver, ArkworksVerifier, CircuitKeys};
    use crate::zk::prover::{ProofService, ProverConfig};
    use crate::zk::types::{signal, to_contract_call_arguments, ContractProofArgs, Groth16Proof, PaymentWitness};
    use crate::zk::verifier::{VerifierAdapter, VerifierConfig};

    // one setup for the whole module; setup dominates test time
    fn circuit_keys() -> &'static CircuitKeys {
        static KEYS: OnceLock<CircuitKeys> = OnceLock::new();
        KEYS.get_or_init(|| CircuitKeys::generate_dev(&mut OsRng).expect("circuit setup"))
    }

    fn prover() -> ProofService<ArkworksProver> {
        ProofService::new(ArkworksProver::new(circuit_keys()), ProverConfig::default())
    }

    fn verifier() -> VerifierAdapter<ArkworksVerifier> {
        VerifierAdapter::new(ArkworksVerifier::new(circuit_keys().verifying_key()), VerifierConfig::default())
    }

    fn reference_keys() -> IdentityKeys {
        IdentityKeys::from_secrets(
            &b256!("0x123456789012345678901234567890123456789012345678901234567890124a").0,
            &b256!("0xabcdefabcdefabcdefabcdefabcdefabcdefabcdefabcdefabcdefabcdefac04").0,
        )
        .unwrap()
    }

    fn reference_params() -> PaymentParameters {
        PaymentParameters {
            amount: U256::from(1000),
            secret_nonce: SecretNonce::from_decimal("999888777").unwrap(),
            payment_type: 2,
            start_date: 1_700_000_000,
            end_date: 1_702_592_000,
        }
    }

    // ==================== Full Pipeline ====================

    /// The reference payment, every stage in order
    #[tokio::test]
    async fn test_reference_payment_pipeline() {
        let mut lifecycle = PaymentLifecycle::new();
        let employee = reference_keys();
        let (view_pub, spend_pub) = (employee.viewing.public_key(), employee.spending.public_key());

        // commitment
        let params = reference_params();
        let commitment = build_commitment(&params, view_pub, spend_pub).unwrap();
        assert_eq!(
            commitment.to_string(),
            "7549250993499029929434323172176276280253612586431187349696562307819812647955"
        );
        lifecycle.transition(PaymentStage::CommitmentComputed).unwrap();

        // proof
        let witness = PaymentWitness::new(&params, view_pub, spend_pub).unwrap();
        let (proof, signals) = prover().generate_proof(&witness).await.unwrap();
        assert_eq!(signals.commitment(), commitment);
        lifecycle.transition(PaymentStage::ProofGenerated).unwrap();

        // verification, with the contract argument layout
        let args = to_contract_call_arguments(&proof);
        verifier().require_valid(&args, &signals).await.unwrap();
        lifecycle.transition(PaymentStage::ProofVerified).unwrap();

        // enrollment coordinates come straight from the proof
        let view = employee.viewing.field_coordinates().unwrap();
        assert_eq!(signals.view_key_coordinates(), [view.x, view.y]);

        // stealth address
        let protocol = StealthAddressProtocol::default();
        let stealth = protocol.generate_stealth_address(view_pub, spend_pub).unwrap();
        lifecycle.transition(PaymentStage::StealthAddressPublished).unwrap();

        // dispatch and settlement record
        let ledger = InMemoryLedger::new();
        let dispatch_tx = keccak256(stealth.stealth_address);
        assert_eq!(
            ledger.record_settlement(signals.commitment(), dispatch_tx).await.unwrap(),
            RecordOutcome::Recorded
        );
        lifecycle.transition(PaymentStage::FundsDispatched).unwrap();

        // recipient side
        assert!(protocol
            .is_payment_for(
                employee.viewing.secret_key(),
                spend_pub,
                &stealth.ephemeral_public_key,
                &stealth.stealth_address,
            )
            .unwrap());
        lifecycle.transition(PaymentStage::PaymentDiscovered).unwrap();

        let recovered = protocol
            .recover_stealth_private_key(
                employee.viewing.secret_key(),
                employee.spending.secret_key(),
                &stealth.ephemeral_public_key,
                &stealth.stealth_address,
            )
            .unwrap();
        assert_eq!(recovered.address(), stealth.stealth_address);
        lifecycle.transition(PaymentStage::StealthKeyRecovered).unwrap();

        // the sweep transaction is signed as the stealth address itself
        let signer = crate::wallet::stealth_signer(&recovered).unwrap();
        assert_eq!(signer.address(), stealth.stealth_address);
        lifecycle.transition(PaymentStage::FundsWithdrawn).unwrap();
        assert!(lifecycle.is_complete());

        // audit: commitment leads back to the dispatch
        assert_eq!(ledger.lookup_settlement(commitment).await.unwrap(), Some(dispatch_tx));
    }

    /// Fresh keys and a fresh nonce, several payments to one employee
    #[tokio::test]
    async fn test_recurring_payments_to_one_employee() {
        let employee = IdentityKeys::generate_circuit_compatible().unwrap();
        let (view_pub, spend_pub) = (employee.viewing.public_key(), employee.spending.public_key());
        let protocol = StealthAddressProtocol::default();
        let mut addresses = Vec::new();
        let mut commitments = Vec::new();

        for month in 0..3u64 {
            let params = PaymentParameters::recurring_from(U256::from(5000), 1_700_000_000 + month * 2_592_000);
            let witness = PaymentWitness::new(&params, view_pub, spend_pub).unwrap();
            let (proof, signals) = prover().generate_proof(&witness).await.unwrap();
            assert!(verifier().verify(&to_contract_call_arguments(&proof), &signals).await.unwrap());

            let stealth = protocol.generate_stealth_address(view_pub, spend_pub).unwrap();
            let recovered = protocol
                .recover_stealth_private_key(
                    employee.viewing.secret_key(),
                    employee.spending.secret_key(),
                    &stealth.ephemeral_public_key,
                    &stealth.stealth_address,
                )
                .unwrap();
            assert_eq!(recovered.address(), stealth.stealth_address);

            addresses.push(stealth.stealth_address);
            commitments.push(signals.commitment());
        }

        // unlinkable on chain: no repeated address or commitment
        addresses.sort();
        addresses.dedup();
        commitments.sort();
        commitments.dedup();
        assert_eq!(addresses.len(), 3);
        assert_eq!(commitments.len(), 3);
    }

    /// A proof serialized to snarkjs JSON and read back still verifies
    #[tokio::test]
    async fn test_proof_survives_json_transport() {
        let employee = reference_keys();
        let witness =
            PaymentWitness::new(&reference_params(), employee.viewing.public_key(), employee.spending.public_key())
                .unwrap();
        let (proof, signals) = prover().generate_proof(&witness).await.unwrap();

        let proof_json = serde_json::to_string(&proof).unwrap();
        let signals_json = serde_json::to_string(&signals).unwrap();
        let proof: Groth16Proof = serde_json::from_str(&proof_json).unwrap();
        let signals = serde_json::from_str(&signals_json).unwrap();

        assert!(verifier().verify(&to_contract_call_arguments(&proof), &signals).await.unwrap());
    }

    // ==================== Negative Cases ====================

    #[tokio::test]
    async fn test_each_flipped_signal_fails_verification() {
        let employee = reference_keys();
        let witness =
            PaymentWitness::new(&reference_params(), employee.viewing.public_key(), employee.spending.public_key())
                .unwrap();
        let (proof, signals) = prover().generate_proof(&witness).await.unwrap();
        let args = to_contract_call_arguments(&proof);
        let verifier = verifier();

        for index in 0..signals.as_array().len() {
            let original = signals.as_array()[index].as_u256();
            let flipped = FieldElement::new(original ^ U256::from(1), "signal").unwrap();
            let tampered = signals.with_signal(index, flipped);
            assert!(!verifier.verify(&args, &tampered).await.unwrap(), "signal {index} accepted");
        }

        let err = verifier
            .require_valid(&args, &signals.with_signal(signal::COMMITMENT, FieldElement::from_u64(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, PayrollError::ProofVerificationFailed));
        assert_eq!(err.phase(), Phase::Verification);
    }

    #[tokio::test]
    async fn test_missing_pi_b_swap_fails_verification() {
        let employee = reference_keys();
        let witness =
            PaymentWitness::new(&reference_params(), employee.viewing.public_key(), employee.spending.public_key())
                .unwrap();
        let (proof, signals) = prover().generate_proof(&witness).await.unwrap();

        let swapped = to_contract_call_arguments(&proof);
        let unswapped = ContractProofArgs {
            p_b: [
                [proof.pi_b[0][0].as_u256(), proof.pi_b[0][1].as_u256()],
                [proof.pi_b[1][0].as_u256(), proof.pi_b[1][1].as_u256()],
            ],
            ..swapped
        };

        assert!(verifier().verify(&swapped, &signals).await.unwrap());
        assert!(!verifier().verify(&unswapped, &signals).await.unwrap());
    }

    #[tokio::test]
    async fn test_forged_commitment_cannot_be_proven() {
        let employee = reference_keys();
        let mut witness =
            PaymentWitness::new(&reference_params(), employee.viewing.public_key(), employee.spending.public_key())
                .unwrap();
        witness.insert("commitment", FieldElement::from_u64(42));

        let err = prover().generate_proof(&witness).await.unwrap_err();
        assert!(matches!(err, PayrollError::ProvingBackend { transient: false, .. }));
    }

    #[tokio::test]
    async fn test_uncommittable_keys_are_rejected_before_proving() {
        // the unadjusted reference view key overflows the field
        let view = KeyPair::from_secret_bytes(
            &b256!("0x1234567890123456789012345678901234567890123456789012345678901234").0,
        )
        .unwrap();
        let spend = reference_keys();

        let err = PaymentWitness::new(&reference_params(), view.public_key(), spend.spending.public_key())
            .unwrap_err();
        assert!(matches!(err, PayrollError::FieldOverflow { .. }));
        assert_eq!(err.phase(), Phase::Commitment);
    }

    #[test]
    fn test_foreign_ephemeral_key_is_a_mismatch() {
        let employee = reference_keys();
        let protocol = StealthAddressProtocol::default();
        let first = protocol
            .generate_stealth_address(employee.viewing.public_key(), employee.spending.public_key())
            .unwrap();
        let second = protocol
            .generate_stealth_address(employee.viewing.public_key(), employee.spending.public_key())
            .unwrap();
        assert_ne!(first.stealth_address, second.stealth_address);

        let err = protocol
            .recover_stealth_private_key(
                employee.viewing.secret_key(),
                employee.spending.secret_key(),
                &second.ephemeral_public_key,
                &first.stealth_address,
            )
            .unwrap_err();
        assert!(matches!(err, PayrollError::StealthDerivationMismatch { .. }));
        assert_eq!(err.phase(), Phase::StealthAddress);
    }

    // ==================== Settlement ====================

    #[tokio::test]
    async fn test_settlement_file_audit_trail() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonFileLedger::new(dir.path().join("settlements.json"));
        let employee = reference_keys();
        let commitment =
            build_commitment(&reference_params(), employee.viewing.public_key(), employee.spending.public_key())
                .unwrap();
        let dispatch_tx = keccak256(address!("fb64f67557dc447168da8c0ed8d347437cf95310"));

        assert_eq!(ledger.record_settlement(commitment, dispatch_tx).await.unwrap(), RecordOutcome::Recorded);
        assert_eq!(
            ledger.record_settlement(commitment, dispatch_tx).await.unwrap(),
            RecordOutcome::AlreadyRecorded
        );

        let replay = ledger.record_settlement(commitment, keccak256(b"replayed dispatch")).await.unwrap_err();
        assert!(matches!(replay, PayrollError::SettlementConflict { existing, .. } if existing == dispatch_tx));
        assert_eq!(replay.phase(), Phase::Settlement);
        assert_eq!(ledger.lookup_settlement(commitment).await.unwrap(), Some(dispatch_tx));
    }
}
