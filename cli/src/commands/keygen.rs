//! Key generation with encrypted storage and mnemonic support

use anyhow::{bail, Result};
use colored::Colorize;
use stealth_payroll::crypto::keys::public_key_hex;
use stealth_payroll::IdentityKeys;

use super::Session;
use crate::secure_storage::{read_new_password, read_password};

pub struct KeygenOptions {
    /// Overwrite existing keys
    pub force: bool,
    /// Derive from a fresh recovery phrase
    pub with_mnemonic: bool,
    pub import_mnemonic: Option<String>,
    /// Optional BIP-39 passphrase
    pub passphrase: Option<String>,
}

/// Keys plus the phrase they came from, if any
pub fn create_identity(options: &KeygenOptions) -> Result<(IdentityKeys, Option<String>)> {
    if let Some(ref phrase) = options.import_mnemonic {
        let passphrase = options.passphrase.as_deref().unwrap_or("");
        return Ok((IdentityKeys::from_mnemonic(phrase, passphrase)?, Some(phrase.clone())));
    }
    if options.with_mnemonic {
        let (keys, phrase) = IdentityKeys::generate_with_mnemonic()?;
        return Ok((keys, Some(phrase)));
    }
    // random keys must still be committable
    Ok((IdentityKeys::generate_circuit_compatible()?, None))
}

pub fn run(session: &Session, options: KeygenOptions) -> Result<()> {
    let storage = session.storage();

    if storage.exists() && !options.force {
        bail!(
            "Payroll keys already exist. Use --force to overwrite.\n\
             Warning: Overwriting keys will make any existing stealth payments unrecoverable!"
        );
    }

    println!("{}", "=== Stealth Payroll Key Generation ===".cyan().bold());
    println!();

    if options.import_mnemonic.is_some() {
        println!("{}", "Importing keys from mnemonic phrase...".cyan());
    } else if options.with_mnemonic {
        println!("{}", "Generating keys with recovery phrase...".cyan());
    } else {
        println!("{}", "Generating random keys (no recovery phrase)...".cyan());
        println!(
            "{}",
            "Warning: Without a recovery phrase, losing your password means losing your funds!".yellow()
        );
    }

    let (keys, mnemonic) = create_identity(&options)?;

    println!();
    println!("{}", "Choose a strong password to encrypt your keys.".cyan());
    println!("{}", "Requirements: 8+ chars, uppercase, lowercase, and numbers".dimmed());
    println!();

    let password = read_new_password("Enter password: ")?;
    storage.save(&keys, &password)?;

    println!();
    println!("{}", "Keys generated and encrypted successfully!".green().bold());
    println!();

    // only a freshly generated phrase is shown; an imported one is already known
    if let (Some(phrase), None) = (&mnemonic, &options.import_mnemonic) {
        print_mnemonic(phrase);
    }

    let meta = keys.meta_address();
    println!("{}:", "View Public Key".yellow());
    println!("  {}", public_key_hex(&meta.view));
    println!();
    println!("{}:", "Spend Public Key".yellow());
    println!("  {}", public_key_hex(&meta.spend));
    println!();
    println!("{}:", "Meta-Address (share this to receive payments)".yellow());
    println!("  {}", meta);
    println!();
    println!(
        "{}",
        format!("Encrypted keys saved to: {}", storage.path().display()).dimmed()
    );
    println!();

    if mnemonic.is_none() {
        println!("{}", "IMPORTANT: You did not use a recovery phrase.".red().bold());
        println!("{}", "If you lose your password, your funds are PERMANENTLY LOST.".red());
        println!("{}", "Consider regenerating without --no-mnemonic for recovery capability.".yellow());
    }

    Ok(())
}

pub fn run_change_password(session: &Session) -> Result<()> {
    let storage = session.storage();
    let old = read_password("Current password: ")?;
    let new = read_new_password("New password: ")?;
    storage.change_password(&old, &new)?;
    println!("{}", "Password changed.".green());
    Ok(())
}

fn print_mnemonic(phrase: &str) {
    println!("{}", "=== RECOVERY PHRASE - WRITE THIS DOWN! ===".red().bold());
    println!();
    println!("{}", "┌────────────────────────────────────────────────────────────┐".yellow());

    let words: Vec<&str> = phrase.split_whitespace().collect();
    for (i, chunk) in words.chunks(4).enumerate() {
        let line: String = chunk
            .iter()
            .enumerate()
            .map(|(j, word)| format!("{:2}. {:<12}", i * 4 + j + 1, word))
            .collect::<Vec<_>>()
            .join(" ");
        println!("│ {} │", format!("{:<58}", line).yellow());
    }

    println!("{}", "└────────────────────────────────────────────────────────────┘".yellow());
    println!();
    println!("{}", "CRITICAL: Store this phrase securely OFFLINE!".red().bold());
    println!("{}", "Anyone with this phrase can recover your keys.".red());
    println!("{}", "You will NOT be shown this phrase again.".red());
    println!();
}
