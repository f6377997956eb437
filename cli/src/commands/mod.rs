//! Subcommand implementations
//!
//! Each command has a `run` entry point that handles prompts and printing,
//! and keeps its core in plain functions the tests call directly.

pub mod address;
pub mod commit;
pub mod configure;
pub mod enroll;
pub mod export_view_key;
pub mod info;
pub mod keygen;
pub mod prove;
pub mod recover;
pub mod scan;
pub mod send;
pub mod settle;
pub mod setup;
pub mod verify;
pub mod withdraw;

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use stealth_payroll::MetaAddress;
use zeroize::Zeroizing;

use crate::config::CliConfig;
use crate::secure_storage::SecureKeyStorage;

/// Read instead of prompting when set
pub const SIGNER_KEY_ENV: &str = "STEALTHPAY_SIGNER_KEY";

/// Resolved global options shared by every command
pub struct Session {
    pub config: CliConfig,
    pub config_path: PathBuf,
    pub keys_path: PathBuf,
    rpc_override: Option<String>,
}

impl Session {
    pub fn new(config: CliConfig, config_path: PathBuf, keys_path: PathBuf, rpc_override: Option<String>) -> Self {
        Self { config, config_path, keys_path, rpc_override }
    }

    pub fn rpc_url(&self) -> &str {
        self.config.rpc_url(self.rpc_override.as_deref())
    }

    pub fn storage(&self) -> SecureKeyStorage {
        SecureKeyStorage::new(self.keys_path.clone())
    }

    /// `explicit` if given, otherwise our own meta-address
    pub fn recipient(&self, explicit: Option<&str>) -> Result<MetaAddress> {
        match explicit {
            Some(text) => text.parse().context("Invalid meta-address"),
            None => self.storage().meta_address(),
        }
    }
}

/// Transaction signer key from `STEALTHPAY_SIGNER_KEY`, else a hidden prompt
pub fn signer_key() -> Result<Zeroizing<String>> {
    if let Ok(key) = std::env::var(SIGNER_KEY_ENV) {
        return Ok(Zeroizing::new(key));
    }
    rpassword::prompt_password("Enter transaction signer private key (hex): ")
        .map(Zeroizing::new)
        .context("Failed to read signer key")
}

pub(crate) fn heading(title: &str) {
    println!();
    println!("{}", title.yellow().bold());
    println!();
}
