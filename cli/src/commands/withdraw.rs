//! Withdraw funds from a stealth address

use alloy::primitives::{Address, U256};
use anyhow::{bail, Result};
use colored::Colorize;
use stealth_payroll::crypto::stealth::RecoveredStealthKey;
use stealth_payroll::wallet::stealth_signer;
use stealth_payroll::{IdentityKeys, StealthWallet, SweepOutcome};

use super::recover::{ephemeral_for, recover_key};
use super::{heading, Session};

pub struct WithdrawOptions {
    /// Stealth address holding the payment
    pub address: Address,
    /// `0x04…` ephemeral key; looked up in the announcement log if absent
    pub ephemeral: Option<String>,
    /// ERC-20 token to sweep
    pub token: Address,
    /// Destination of the funds
    pub to: Address,
}

/// Recover the stealth key and make sure it signs as the published address
pub fn withdrawal_key(keys: &IdentityKeys, ephemeral: &k256::PublicKey, address: &Address) -> Result<RecoveredStealthKey> {
    let recovered = recover_key(keys, ephemeral, address)?;
    stealth_signer(&recovered)?;
    Ok(recovered)
}

pub async fn run(session: &Session, options: WithdrawOptions) -> Result<()> {
    println!("{}", "Preparing withdrawal...".cyan());

    let ephemeral = ephemeral_for(
        &options.address,
        options.ephemeral.as_deref(),
        &session.config.announcements_path,
    )?;
    let keys = session.storage().unlock()?;
    let recovered = withdrawal_key(&keys, &ephemeral, &options.address)?;

    let wallet = StealthWallet::connect(session.rpc_url(), &recovered)?;

    let balance = wallet.token_balance(options.token).await?;
    println!("Stealth address token balance: {}", balance);
    if balance.is_zero() {
        println!("{}", "No funds to withdraw.".yellow());
        return Ok(());
    }

    if wallet.gas_balance().await? == U256::ZERO {
        bail!(
            "Stealth address {} holds no ETH for gas.\n\
             Send a small amount to it from any account, then retry.",
            wallet.address()
        );
    }

    println!();
    println!("Withdrawing {} to {}...", balance, options.to);

    match wallet.sweep(options.token, options.to).await? {
        SweepOutcome::Empty => println!("{}", "No funds to withdraw.".yellow()),
        SweepOutcome::Transferred { amount, tx_hash } => {
            println!();
            println!("{}", "Withdrawal successful!".green().bold());
            heading("Withdrawal");
            println!("  Transaction: {}", tx_hash);
            println!("  Amount:      {}", amount);
            println!("  From:        {}", wallet.address());
            println!("  To:          {}", options.to);
        }
    }

    Ok(())
}
