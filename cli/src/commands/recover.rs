//! Recover the private key of a stealth address

use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use colored::Colorize;
use stealth_payroll::crypto::keys::parse_public_key;
use stealth_payroll::crypto::stealth::RecoveredStealthKey;
use stealth_payroll::{IdentityKeys, StealthAddressProtocol};

use super::{heading, Session};
use crate::artifacts::load_announcements;

pub struct RecoverOptions {
    pub address: Address,
    /// `0x04…` ephemeral key; looked up in the announcement log if absent
    pub ephemeral: Option<String>,
    /// Print the private key
    pub reveal: bool,
}

pub fn ephemeral_for(address: &Address, explicit: Option<&str>, announcements: &Path) -> Result<k256::PublicKey> {
    if let Some(text) = explicit {
        return parse_public_key(text).context("Invalid ephemeral public key");
    }
    load_announcements(announcements)?
        .into_iter()
        .find(|a| a.stealth_address == *address)
        .with_context(|| format!("No announcement for {address}; pass --ephemeral"))?
        .ephemeral_key()
}

pub fn recover_key(keys: &IdentityKeys, ephemeral: &k256::PublicKey, address: &Address) -> Result<RecoveredStealthKey> {
    Ok(StealthAddressProtocol::default().recover_stealth_private_key(
        keys.viewing.secret_key(),
        keys.spending.secret_key(),
        ephemeral,
        address,
    )?)
}

pub fn run(session: &Session, options: RecoverOptions) -> Result<()> {
    let ephemeral = ephemeral_for(
        &options.address,
        options.ephemeral.as_deref(),
        &session.config.announcements_path,
    )?;
    let keys = session.storage().unlock()?;

    let recovered = recover_key(&keys, &ephemeral, &options.address)?;

    heading("Stealth Key Recovered");
    println!("  Address: {}", recovered.address());
    println!();

    if options.reveal {
        println!("{}:", "Private key".yellow());
        println!("  0x{}", hex::encode(&recovered.secret_bytes()[..]));
        println!();
        println!("{}", "WARNING: Anyone with this key can move the funds at this address!".red().bold());
    } else {
        println!("{}", "The key matches the published address.".green());
        println!("{}", "Re-run with --reveal to print it for import into a wallet.".dimmed());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{append_announcement, Announcement};
    use stealth_payroll::crypto::keys::public_key_hex;
    use tempfile::tempdir;

    #[test]
    fn test_ephemeral_from_log_or_flag() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("announcements.json");
        let keys = IdentityKeys::generate().unwrap();
        let stealth = StealthAddressProtocol::default()
            .generate_stealth_address(keys.viewing.public_key(), keys.spending.public_key())
            .unwrap();
        append_announcement(
            &log,
            Announcement::new(&stealth.ephemeral_public_key, stealth.stealth_address, None, None),
        )
        .unwrap();

        let from_log = ephemeral_for(&stealth.stealth_address, None, &log).unwrap();
        assert_eq!(from_log, stealth.ephemeral_public_key);

        let hex = public_key_hex(&stealth.ephemeral_public_key);
        let from_flag = ephemeral_for(&Address::ZERO, Some(&hex), &log).unwrap();
        assert_eq!(from_flag, stealth.ephemeral_public_key);

        assert!(ephemeral_for(&Address::ZERO, None, &log).is_err());
    }

    #[test]
    fn test_wrong_keys_report_stealth_phase() {
        let payee = IdentityKeys::generate().unwrap();
        let stranger = IdentityKeys::generate().unwrap();
        let stealth = StealthAddressProtocol::default()
            .generate_stealth_address(payee.viewing.public_key(), payee.spending.public_key())
            .unwrap();

        let err = recover_key(&stranger, &stealth.ephemeral_public_key, &stealth.stealth_address).unwrap_err();
        let payroll = err.downcast_ref::<stealth_payroll::PayrollError>().unwrap();
        assert_eq!(payroll.phase(), stealth_payroll::Phase::StealthAddress);

        let spend_secret = hex::encode(&stranger.spending.export_secret()[..]);
        assert!(!format!("{err:?}").contains(&spend_secret));
    }
}
