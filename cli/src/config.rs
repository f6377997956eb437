//! Configuration for the stealthpay CLI
//!
//! Everything lives under `~/.stealth-payroll/`: the JSON config, the
//! encrypted key file, the local settlement ledger and the announcement log.

use std::fs;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Default directory for all CLI state
const PAYROLL_DIR: &str = ".stealth-payroll";
const CONFIG_FILE: &str = "config.json";
const KEYS_FILE: &str = "keys.enc";
const LEDGER_FILE: &str = "settlements.json";
const ANNOUNCEMENTS_FILE: &str = "announcements.json";

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Persisted CLI settings. Global flags override these per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub rpc_url: String,
    /// Groth16 verifier contract
    pub verifier_address: Option<Address>,
    /// Payroll organisation contract
    pub organisation_address: Option<Address>,
    pub snarkjs_binary: PathBuf,
    pub circuit_wasm: Option<PathBuf>,
    /// circom `.zkey` for the snarkjs backend
    pub circuit_zkey: Option<PathBuf>,
    /// Serialized proving key for the in-process backend
    pub circuit_keys: Option<PathBuf>,
    pub ledger_path: PathBuf,
    pub announcements_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        let dir = payroll_dir().unwrap_or_else(|_| PathBuf::from(PAYROLL_DIR));
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            verifier_address: None,
            organisation_address: None,
            snarkjs_binary: PathBuf::from("snarkjs"),
            circuit_wasm: None,
            circuit_zkey: None,
            circuit_keys: None,
            ledger_path: dir.join(LEDGER_FILE),
            announcements_path: dir.join(ANNOUNCEMENTS_FILE),
        }
    }
}

impl CliConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write config file {}", path.display()))
    }

    pub fn rpc_url<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.unwrap_or(&self.rpc_url)
    }

    pub fn require_verifier(&self) -> Result<Address> {
        match self.verifier_address {
            Some(address) => Ok(address),
            None => bail!("No verifier contract configured. Run 'stealthpay config --verifier <ADDRESS>'."),
        }
    }

    pub fn require_organisation(&self) -> Result<Address> {
        match self.organisation_address {
            Some(address) => Ok(address),
            None => bail!(
                "No organisation contract configured. Run 'stealthpay config --organisation <ADDRESS>'."
            ),
        }
    }

    /// Apply a `config` command's settings; returns whether anything changed
    pub fn apply(&mut self, update: ConfigUpdate) -> bool {
        let mut changed = false;
        macro_rules! set {
            ($field:ident, $value:expr) => {
                if let Some(value) = $value {
                    self.$field = value;
                    changed = true;
                }
            };
        }
        set!(rpc_url, update.rpc_url);
        set!(verifier_address, update.verifier_address.map(Some));
        set!(organisation_address, update.organisation_address.map(Some));
        set!(snarkjs_binary, update.snarkjs_binary);
        set!(circuit_wasm, update.circuit_wasm.map(Some));
        set!(circuit_zkey, update.circuit_zkey.map(Some));
        set!(circuit_keys, update.circuit_keys.map(Some));
        set!(ledger_path, update.ledger_path);
        set!(announcements_path, update.announcements_path);
        changed
    }
}

/// Settings given to `stealthpay config`
#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub rpc_url: Option<String>,
    pub verifier_address: Option<Address>,
    pub organisation_address: Option<Address>,
    pub snarkjs_binary: Option<PathBuf>,
    pub circuit_wasm: Option<PathBuf>,
    pub circuit_zkey: Option<PathBuf>,
    pub circuit_keys: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
    pub announcements_path: Option<PathBuf>,
}

/// Get the CLI state directory
pub fn payroll_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(PAYROLL_DIR))
        .context("Could not find home directory")
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(payroll_dir()?.join(CONFIG_FILE))
}

pub fn default_keys_path() -> Result<PathBuf> {
    Ok(payroll_dir()?.join(KEYS_FILE))
}
