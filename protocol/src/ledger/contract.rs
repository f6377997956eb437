//! Organisation payroll contract
//!
//! The organisation contract enrolls recipients, dispatches verified
//! payments to stealth addresses and keeps the on-chain
//! `commitment → transaction hash` map that [`ContractLedger`] exposes as a
//! [`SettlementLedger`].

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use tracing::{debug, info, instrument};
use zeroize::Zeroizing;

use super::{resolve_existing, RecordOutcome, SettlementLedger};
use crate::crypto::keys::KeyCoordinates;
use crate::crypto::poseidon::Commitment;
use crate::error::{PayrollError, Result};
use crate::zk::types::{ContractProofArgs, PublicSignals};

sol! {
    #[sol(rpc)]
    interface IPayrollOrganisation {
        function addEmployee(
            uint256[2] calldata publicViewerKey,
            uint256[2] calldata publicSpenderKey
        ) external;

        function dispatchPayment(
            uint256 employeeId,
            address token,
            uint256 amount,
            uint256[2] calldata pA,
            uint256[2][2] calldata pB,
            uint256[2] calldata pC,
            uint256[8] calldata pubSignals,
            address stealthAddress
        ) external;

        function updateCommitmentTransactionHash(uint256 commitment, bytes32 transactionHash) external;

        function commitmentToHash(uint256 commitment) external view returns (bytes32);
    }
}

/// Everything the payment dispatcher needs besides the proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRequest {
    pub employee_id: U256,
    pub token: Address,
    pub amount: U256,
    pub stealth_address: Address,
}

#[derive(Clone)]
pub struct OrganisationContract {
    provider: DynProvider,
    address: Address,
}

impl OrganisationContract {
    pub fn new(provider: DynProvider, address: Address) -> Self {
        Self { provider, address }
    }

    /// Read-only connection (lookups only)
    pub fn connect(rpc_url: &str, address: Address) -> Result<Self> {
        let provider = ProviderBuilder::new().connect_http(parse_url(rpc_url)?).erased();
        Ok(Self::new(provider, address))
    }

    /// Connection that signs transactions with `private_key` (hex)
    pub fn connect_with_signer(rpc_url: &str, private_key: &Zeroizing<String>, address: Address) -> Result<Self> {
        // the parse error may echo its input, so it is not forwarded
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|_| PayrollError::Transaction("invalid signer private key".into()))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(parse_url(rpc_url)?)
            .erased();
        Ok(Self::new(provider, address))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Enroll a recipient by the field coordinates of their two public keys
    #[instrument(skip_all, fields(organisation = %self.address))]
    pub async fn enroll_keys(&self, view: &KeyCoordinates, spend: &KeyCoordinates) -> Result<B256> {
        let org = IPayrollOrganisation::new(self.address, &self.provider);
        let pending = org
            .addEmployee([view.x.as_u256(), view.y.as_u256()], [spend.x.as_u256(), spend.y.as_u256()])
            .send()
            .await;
        let tx_hash = confirm(pending, "addEmployee").await?;
        info!(%tx_hash, "recipient enrolled");
        Ok(tx_hash)
    }

    /// Enroll a recipient with the key coordinates a proof exposed.
    ///
    /// Taking them from the public signals keeps the on-chain keys identical
    /// to what every later proof for this recipient references.
    pub async fn enroll_recipient(&self, public_signals: &PublicSignals) -> Result<B256> {
        let [x, y] = public_signals.view_key_coordinates();
        let view = KeyCoordinates { x, y };
        let [x, y] = public_signals.spend_key_coordinates();
        let spend = KeyCoordinates { x, y };
        self.enroll_keys(&view, &spend).await
    }

    /// Pay `request.amount` of `request.token` to the stealth address; the
    /// contract verifies the proof before moving funds.
    #[instrument(skip_all, fields(organisation = %self.address, stealth = %request.stealth_address))]
    pub async fn dispatch_payment(
        &self,
        request: &DispatchRequest,
        proof: &ContractProofArgs,
        public_signals: &PublicSignals,
    ) -> Result<B256> {
        let org = IPayrollOrganisation::new(self.address, &self.provider);
        let pending = org
            .dispatchPayment(
                request.employee_id,
                request.token,
                request.amount,
                proof.p_a,
                proof.p_b,
                proof.p_c,
                public_signals.to_u256_array(),
                request.stealth_address,
            )
            .send()
            .await;
        let tx_hash = confirm(pending, "dispatchPayment").await?;
        info!(%tx_hash, commitment = %public_signals.commitment(), "payment dispatched");
        Ok(tx_hash)
    }

    /// Settlement hash for `commitment`; the zero hash means none.
    pub async fn commitment_to_hash(&self, commitment: Commitment) -> Result<Option<B256>> {
        let org = IPayrollOrganisation::new(self.address, &self.provider);
        let hash = org
            .commitmentToHash(commitment.as_u256())
            .call()
            .await
            .map_err(|e| PayrollError::Storage(e.to_string()))?;
        Ok((hash != B256::ZERO).then_some(hash))
    }

    pub async fn update_commitment_transaction_hash(&self, commitment: Commitment, tx_hash: B256) -> Result<B256> {
        let org = IPayrollOrganisation::new(self.address, &self.provider);
        let pending = org
            .updateCommitmentTransactionHash(commitment.as_u256(), tx_hash)
            .send()
            .await;
        confirm(pending, "updateCommitmentTransactionHash").await
    }
}

/// [`SettlementLedger`] over the organisation contract's commitment map.
///
/// The read-then-write is not atomic across writers; the contract is the
/// final arbiter if two processes settle the same commitment at once.
#[derive(Clone)]
pub struct ContractLedger {
    contract: OrganisationContract,
}

impl ContractLedger {
    pub fn new(contract: OrganisationContract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &OrganisationContract {
        &self.contract
    }
}

impl SettlementLedger for ContractLedger {
    async fn record_settlement(&self, commitment: Commitment, tx_hash: B256) -> Result<RecordOutcome> {
        let existing = self.contract.commitment_to_hash(commitment).await?;
        if let Some(outcome) = resolve_existing(&commitment, existing, tx_hash)? {
            return Ok(outcome);
        }
        let update = self.contract.update_commitment_transaction_hash(commitment, tx_hash).await?;
        debug!(%commitment, %tx_hash, %update, "settlement recorded on chain");
        Ok(RecordOutcome::Recorded)
    }

    async fn lookup_settlement(&self, commitment: Commitment) -> Result<Option<B256>> {
        self.contract.commitment_to_hash(commitment).await
    }
}

pub(crate) fn parse_url(rpc_url: &str) -> Result<Url> {
    rpc_url
        .parse::<Url>()
        .map_err(|e| PayrollError::Transaction(format!("invalid RPC URL: {e}")))
}

pub(crate) async fn confirm(
    pending: std::result::Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>,
    call: &'static str,
) -> Result<B256> {
    let receipt = pending
        .map_err(|e| PayrollError::Transaction(format!("{call}: {e}")))?
        .get_receipt()
        .await
        .map_err(|e| PayrollError::Transaction(format!("{call}: {e}")))?;

    if !receipt.status() {
        return Err(PayrollError::Transaction(format!(
            "{call} reverted in {}",
            receipt.transaction_hash
        )));
    }
    Ok(receipt.transaction_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolCall;

    #[test]
    fn test_function_signatures() {
        assert_eq!(
            IPayrollOrganisation::dispatchPaymentCall::SIGNATURE,
            "dispatchPayment(uint256,address,uint256,uint256[2],uint256[2][2],uint256[2],uint256[8],address)"
        );
        assert_eq!(
            IPayrollOrganisation::addEmployeeCall::SIGNATURE,
            "addEmployee(uint256[2],uint256[2])"
        );
        assert_eq!(
            IPayrollOrganisation::commitmentToHashCall::SIGNATURE,
            "commitmentToHash(uint256)"
        );
    }

    #[test]
    fn test_bad_signer_key_does_not_echo_input() {
        let secret = Zeroizing::new("0xnot-a-key-but-secret".to_string());
        let err = OrganisationContract::connect_with_signer("http://localhost:8545", &secret, Address::ZERO)
            .err()
            .unwrap();
        assert!(!err.to_string().contains("not-a-key-but-secret"));
    }
}
