//! snarkjs proving backend
//!
//! For each proof [`SnarkjsProver`]:
//! 1. Writes the witness as circom `input.json` into a private temp dir
//! 2. Runs `snarkjs groth16 fullprove input.json <wasm> <zkey> proof.json public.json`
//! 3. Reads both outputs back
//!
//! The child is killed if the proving future is dropped (timeout or
//! cancellation), and the temp dir holding the witness is removed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::prover::ProvingBackend;
use super::types::{Groth16Proof, PaymentWitness, PublicSignals};
use crate::error::{PayrollError, Result};

/// Generates proofs by shelling out to `snarkjs`
#[derive(Debug, Clone)]
pub struct SnarkjsProver {
    binary: PathBuf,
    circuit_wasm: PathBuf,
    proving_key: PathBuf,
}

impl SnarkjsProver {
    pub fn new(binary: impl Into<PathBuf>, circuit_wasm: impl Into<PathBuf>, proving_key: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            circuit_wasm: circuit_wasm.into(),
            proving_key: proving_key.into(),
        }
    }

    fn check_artifacts(&self) -> Result<()> {
        for (path, what) in [(&self.circuit_wasm, "circuit wasm"), (&self.proving_key, "proving key")] {
            if !path.exists() {
                return Err(PayrollError::fatal_backend(format!("{what} not found: {}", path.display())));
            }
        }
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PayrollError::fatal_backend(format!("snarkjs produced no {what}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| PayrollError::fatal_backend(format!("malformed {what}: {e}")))
}

impl ProvingBackend for SnarkjsProver {
    async fn full_prove(&self, witness: &PaymentWitness) -> Result<(Groth16Proof, PublicSignals)> {
        self.check_artifacts()?;

        let scratch = tempfile::tempdir()
            .map_err(|e| PayrollError::transient_backend(format!("cannot create scratch dir: {e}")))?;
        let input_path = scratch.path().join("input.json");
        let proof_path = scratch.path().join("proof.json");
        let public_path = scratch.path().join("public.json");

        let input = serde_json::to_vec(&witness.to_circom_input())
            .map_err(|e| PayrollError::fatal_backend(format!("witness encoding failed: {e}")))?;
        tokio::fs::write(&input_path, input)
            .await
            .map_err(|e| PayrollError::transient_backend(format!("cannot write witness: {e}")))?;

        debug!(binary = %self.binary.display(), "running snarkjs groth16 fullprove");
        let output = Command::new(&self.binary)
            .arg("groth16")
            .arg("fullprove")
            .arg(&input_path)
            .arg(&self.circuit_wasm)
            .arg(&self.proving_key)
            .arg(&proof_path)
            .arg(&public_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    PayrollError::fatal_backend(format!("snarkjs binary not found: {}", self.binary.display()))
                }
                _ => PayrollError::transient_backend(format!("cannot start snarkjs: {e}")),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            // killed by a signal (OOM killer, SIGTERM) vs. a reported failure
            return Err(match output.status.code() {
                None => PayrollError::transient_backend(format!("snarkjs terminated: {stderr}")),
                Some(code) => PayrollError::fatal_backend(format!("snarkjs exited with {code}: {stderr}")),
            });
        }

        let proof: Groth16Proof = read_json(&proof_path, "proof").await?;
        let public: Vec<String> = read_json(&public_path, "public signals").await?;
        let signals = PublicSignals::from_decimal_strings(&public)?;

        Ok((proof, signals))
    }

    fn name(&self) -> &'static str {
        "snarkjs"
    }
}
