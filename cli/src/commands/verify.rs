//! Verify a proof bundle locally or against the verifier contract

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use stealth_payroll::zk::{ArkworksVerifier, ContractVerifier, ProofVerifier, VerifierConfig};
use stealth_payroll::{to_contract_call_arguments, VerifierAdapter};

use super::prove::load_circuit_keys;
use super::Session;
use crate::artifacts::{read_json, ProofBundle};

pub struct VerifyOptions {
    pub proof: PathBuf,
    /// Call the configured verifier contract instead of verifying locally
    pub onchain: bool,
    /// Verifying key from `stealthpay setup`; else derived from the proving key
    pub verifying_key: Option<PathBuf>,
}

/// Runs the verifier exactly as the contract would be called, pB swap included
pub async fn verify_bundle<V: ProofVerifier>(adapter: &VerifierAdapter<V>, bundle: &ProofBundle) -> Result<bool> {
    let args = to_contract_call_arguments(&bundle.proof);
    Ok(adapter.verify(&args, &bundle.public_signals).await?)
}

pub fn local_verifier(verifying_key: Option<&Path>, circuit_keys: Option<&Path>) -> Result<ArkworksVerifier> {
    if let Some(path) = verifying_key {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read verifying key {}", path.display()))?;
        return Ok(ArkworksVerifier::from_bytes(&bytes)?);
    }
    let path = circuit_keys.context("No verifying key given and no circuit keys configured")?;
    Ok(ArkworksVerifier::new(load_circuit_keys(path)?.verifying_key()))
}

pub async fn run(session: &Session, options: VerifyOptions) -> Result<()> {
    let bundle: ProofBundle = read_json(&options.proof, "proof bundle")?;
    let config = VerifierConfig::default();

    let valid = if options.onchain {
        let verifier = ContractVerifier::connect(session.rpc_url(), session.config.require_verifier()?)?;
        println!("{}", format!("Calling verifier contract {}...", verifier.address()).cyan());
        verify_bundle(&VerifierAdapter::new(verifier, config), &bundle).await?
    } else {
        let verifier = local_verifier(options.verifying_key.as_deref(), session.config.circuit_keys.as_deref())?;
        println!("{}", "Verifying locally...".cyan());
        verify_bundle(&VerifierAdapter::new(verifier, config), &bundle).await?
    };

    println!();
    println!("  Commitment: {}", bundle.public_signals.commitment());
    if valid {
        println!("{}", "Proof is VALID".green().bold());
        Ok(())
    } else {
        println!("{}", "Proof is INVALID".red().bold());
        Err(stealth_payroll::PayrollError::ProofVerificationFailed.into())
    }
}
