//! Stealth Payroll - private payroll over stealth addresses and ZK commitments
//!
//! An organisation pays an employee on a public chain without linking the
//! receiving address to the employee (dual-key stealth addresses on
//! secp256k1) and proves the payment commitment was formed correctly
//! without revealing it (Poseidon commitment, Groth16 over BN254).
//!
//! Flow:
//! 1. [`crypto::keys`]: the employee holds a viewing and a spending key pair
//! 2. [`crypto::poseidon`]: the payer commits to amount, nonce, keys and dates
//! 3. [`zk::ProofService`]: proves the commitment is well formed
//! 4. [`zk::VerifierAdapter`]: the verifier contract checks the proof
//! 5. [`crypto::stealth`]: the payer derives a one-time address; the employee
//!    later recovers its private key
//! 6. [`ledger`]: the settlement transaction is recorded against the commitment
//! 7. [`wallet`]: the employee sweeps the stealth address with the recovered key

pub mod crypto;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod retry;
pub mod wallet;
pub mod zk;

pub use crypto::{
    build_commitment, Commitment, IdentityKeys, KeyPair, MetaAddress, PaymentParameters,
    SecretNonce, StealthAddress, StealthAddressProtocol,
};
pub use error::{PayrollError, Phase, Result};
pub use ledger::{RecordOutcome, SettlementLedger};
pub use lifecycle::{PaymentLifecycle, PaymentStage};
pub use retry::RetryPolicy;
pub use wallet::{StealthWallet, SweepOutcome};
pub use zk::{
    to_contract_call_arguments, ContractProofArgs, Groth16Proof, PaymentWitness, ProofService,
    PublicSignals, VerifierAdapter,
};


#[cfg(test)]
mod test_vectors;


#[cfg(test)]
mod integration_tests;
