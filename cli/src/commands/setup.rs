//! Development Groth16 setup for the in-process prover

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use rand::rngs::OsRng;
use stealth_payroll::zk::CircuitKeys;

use super::{heading, Session};

const PROVING_KEY_FILE: &str = "payment.pk";
const VERIFYING_KEY_FILE: &str = "payment.vk";

/// Write fresh keys into `dir`; returns (proving key, verifying key) paths
pub fn write_dev_keys(dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let keys = CircuitKeys::generate_dev(&mut OsRng)?;
    fs::create_dir_all(dir).context("Failed to create circuit key directory")?;

    let pk_path = dir.join(PROVING_KEY_FILE);
    let vk_path = dir.join(VERIFYING_KEY_FILE);
    fs::write(&pk_path, keys.to_bytes()?).context("Failed to write proving key")?;
    fs::write(&vk_path, keys.verifying_key_bytes()?).context("Failed to write verifying key")?;
    Ok((pk_path, vk_path))
}

pub fn run(session: &mut Session, out: PathBuf) -> Result<()> {
    println!("{}", "Running single-party circuit setup (this takes a while)...".cyan());

    let (pk_path, vk_path) = write_dev_keys(&out)?;

    session.config.circuit_keys = Some(pk_path.clone());
    session.config.save(&session.config_path)?;

    heading("Circuit Keys Generated");
    println!("  Proving key:   {}", pk_path.display());
    println!("  Verifying key: {}", vk_path.display());
    println!();
    println!("{}", "The proving key is now the default for 'stealthpay prove --backend arkworks'.".dimmed());
    println!();
    println!("{}", "WARNING: Development setup only.".red().bold());
    println!("{}", "Whoever ran this setup could forge proofs; never use these keys in production.".red());

    Ok(())
}
