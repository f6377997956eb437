//! Sweeping a stealth address
//!
//! Once the recipient has recovered the stealth private key, the ERC-20
//! balance is moved to an address of their choosing by a `transfer` signed
//! with that key. The stealth address pays its own gas, so it needs some
//! native balance first.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use tracing::{info, instrument};

use crate::crypto::stealth::RecoveredStealthKey;
use crate::error::{PayrollError, Result};
use crate::ledger::contract::{confirm, parse_url};

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The stealth address held none of the token
    Empty,
    Transferred { amount: U256, tx_hash: B256 },
}

/// Transaction signer for a recovered key, checked against its address
pub fn stealth_signer(recovered: &RecoveredStealthKey) -> Result<PrivateKeySigner> {
    let secret = recovered.secret_bytes();
    let signer = PrivateKeySigner::from_bytes(&B256::from_slice(&secret[..]))
        .map_err(|_| PayrollError::KeyFormat("stealth secret is not a signing key".into()))?;
    if signer.address() != recovered.address() {
        return Err(PayrollError::StealthDerivationMismatch {
            expected: recovered.address(),
            recovered: signer.address(),
        });
    }
    Ok(signer)
}

/// A provider that signs as the stealth address
#[derive(Clone)]
pub struct StealthWallet {
    provider: DynProvider,
    address: Address,
}

impl StealthWallet {
    pub fn connect(rpc_url: &str, recovered: &RecoveredStealthKey) -> Result<Self> {
        let signer = stealth_signer(recovered)?;
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(parse_url(rpc_url)?)
            .erased();
        Ok(Self { provider, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Native balance available for gas
    pub async fn gas_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.address)
            .await
            .map_err(|e| PayrollError::Transaction(format!("eth_getBalance: {e}")))
    }

    pub async fn token_balance(&self, token: Address) -> Result<U256> {
        IERC20::new(token, &self.provider)
            .balanceOf(self.address)
            .call()
            .await
            .map_err(|e| PayrollError::Transaction(format!("balanceOf: {e}")))
    }

    /// Transfer the whole token balance to `to`
    #[instrument(skip_all, fields(stealth = %self.address, token = %token, to = %to))]
    pub async fn sweep(&self, token: Address, to: Address) -> Result<SweepOutcome> {
        let amount = self.token_balance(token).await?;
        if amount.is_zero() {
            return Ok(SweepOutcome::Empty);
        }

        let pending = IERC20::new(token, &self.provider).transfer(to, amount).send().await;
        let tx_hash = confirm(pending, "transfer").await?;
        info!(%tx_hash, %amount, "stealth balance swept");
        Ok(SweepOutcome::Transferred { amount, tx_hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyPair;
    use crate::crypto::stealth::StealthAddressProtocol;
    use alloy::sol_types::SolCall;

    fn recovered() -> RecoveredStealthKey {
        let viewing = KeyPair::generate().unwrap();
        let spending = KeyPair::generate().unwrap();
        let protocol = StealthAddressProtocol::default();
        let stealth = protocol
            .generate_stealth_address(viewing.public_key(), spending.public_key())
            .unwrap();
        protocol
            .recover_stealth_private_key(
                viewing.secret_key(),
                spending.secret_key(),
                &stealth.ephemeral_public_key,
                &stealth.stealth_address,
            )
            .unwrap()
    }

    #[test]
    fn test_signer_signs_as_stealth_address() {
        let key = recovered();
        let signer = stealth_signer(&key).unwrap();
        assert_eq!(signer.address(), key.address());
    }

    #[test]
    fn test_transfer_signature() {
        assert_eq!(IERC20::transferCall::SIGNATURE, "transfer(address,uint256)");
        assert_eq!(IERC20::balanceOfCall::SIGNATURE, "balanceOf(address)");
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let err = StealthWallet::connect("not a url", &recovered()).err().unwrap();
        assert!(matches!(err, PayrollError::Transaction(_)));
    }

    #[test]
    fn test_wallet_address_is_stealth_address() {
        let key = recovered();
        let wallet = StealthWallet::connect("http://127.0.0.1:8545", &key).unwrap();
        assert_eq!(wallet.address(), key.address());
    }
}
