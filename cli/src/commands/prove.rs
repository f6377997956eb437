//! Generate a Groth16 proof for a payment file

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use stealth_payroll::zk::{ArkworksProver, CircuitKeys, ProverConfig, ProvingBackend, SnarkjsProver};
use stealth_payroll::{PaymentWitness, ProofService};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{heading, Session};
use crate::artifacts::{read_json, write_json, PaymentFile, ProofBundle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// In-process prover over keys from `stealthpay setup`
    Arkworks,
    /// `snarkjs groth16 fullprove` with the circom wasm and zkey
    Snarkjs,
}

pub struct ProveOptions {
    pub payment: PathBuf,
    pub backend: Backend,
    pub out: PathBuf,
    pub timeout_secs: Option<u64>,
}

/// Witness for a payment file, checked against the stored commitment
pub fn witness_for(payment: &PaymentFile) -> Result<PaymentWitness> {
    let recipient = payment.recipient()?;
    let witness = PaymentWitness::new(&payment.parameters, &recipient.view, &recipient.spend)?;
    if witness.commitment()? != payment.commitment {
        bail!("Payment file commitment does not match its parameters; rebuild it with 'stealthpay commit'");
    }
    Ok(witness)
}

pub async fn prove_payment<B: ProvingBackend>(
    service: &ProofService<B>,
    payment: &PaymentFile,
    cancel: &CancellationToken,
) -> Result<ProofBundle> {
    let witness = witness_for(payment)?;
    let (proof, public_signals) = service.generate_proof_with_cancel(&witness, cancel).await?;
    Ok(ProofBundle { proof, public_signals })
}

pub fn load_circuit_keys(path: &Path) -> Result<CircuitKeys> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read circuit keys {}", path.display()))?;
    Ok(CircuitKeys::from_bytes(&bytes)?)
}

pub async fn run(session: &Session, options: ProveOptions) -> Result<()> {
    let payment: PaymentFile = read_json(&options.payment, "payment file")?;

    let mut config = ProverConfig::default();
    if let Some(secs) = options.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }

    // Ctrl-C stops the prover (and kills a snarkjs child)
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    println!("{}", format!("Proving with the {:?} backend...", options.backend).cyan());

    let bundle = match options.backend {
        Backend::Arkworks => {
            let path = session
                .config
                .circuit_keys
                .as_deref()
                .context("No circuit keys configured. Run 'stealthpay setup' first.")?;
            let service = ProofService::new(ArkworksProver::new(&load_circuit_keys(path)?), config);
            prove_payment(&service, &payment, &cancel).await?
        }
        Backend::Snarkjs => {
            let (Some(wasm), Some(zkey)) = (&session.config.circuit_wasm, &session.config.circuit_zkey) else {
                bail!("snarkjs needs circuit wasm and zkey paths. Set them with 'stealthpay config'.");
            };
            let prover = SnarkjsProver::new(&session.config.snarkjs_binary, wasm, zkey);
            let service = ProofService::new(prover, config);
            prove_payment(&service, &payment, &cancel).await?
        }
    };

    write_json(&options.out, &bundle, "proof bundle")?;
    info!(commitment = %bundle.public_signals.commitment(), "proof written");

    heading("Proof Generated");
    println!("{}:", "Public signals".cyan());
    for (name, value) in stealth_payroll::zk::PUBLIC_SIGNAL_NAMES
        .iter()
        .zip(bundle.public_signals.to_decimal_strings())
    {
        println!("  {:<12} {}", name, value);
    }
    println!();
    println!("{}", format!("Proof bundle saved to: {}", options.out.display()).dimmed());

    Ok(())
}
