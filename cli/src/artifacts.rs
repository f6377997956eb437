//! Files passed between commands
//!
//! - payment file (`commit` → `prove`): recipient, parameters, commitment.
//!   Holds the secret nonce, so it is written owner-only.
//! - proof bundle (`prove` → `verify` / `send`): proof plus public signals
//! - announcement log (`send` → `scan` / `recover`): one entry per payment

use std::fs;
use std::io::Write;
use std::path::Path;

use alloy::primitives::{Address, B256};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stealth_payroll::crypto::keys::{parse_public_key, public_key_hex};
use stealth_payroll::{Commitment, Groth16Proof, MetaAddress, PaymentParameters, PublicSignals};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFile {
    /// `st:eth:0x…` meta-address of the recipient
    pub recipient: String,
    pub parameters: PaymentParameters,
    pub commitment: Commitment,
}

impl PaymentFile {
    pub fn recipient(&self) -> Result<MetaAddress> {
        self.recipient.parse().context("Payment file holds an invalid recipient meta-address")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub proof: Groth16Proof,
    pub public_signals: PublicSignals,
}

/// What a payer publishes so the recipient can find a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    /// `0x04…` uncompressed ephemeral public key
    pub ephemeral_public_key: String,
    pub stealth_address: Address,
    pub commitment: Option<Commitment>,
    pub transaction_hash: Option<B256>,
    pub created_at: String,
}

impl Announcement {
    pub fn new(
        ephemeral_public_key: &k256::PublicKey,
        stealth_address: Address,
        commitment: Option<Commitment>,
        transaction_hash: Option<B256>,
    ) -> Self {
        Self {
            ephemeral_public_key: public_key_hex(ephemeral_public_key),
            stealth_address,
            commitment,
            transaction_hash,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn ephemeral_key(&self) -> Result<k256::PublicKey> {
        parse_public_key(&self.ephemeral_public_key).context("Announcement holds an invalid ephemeral key")
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {what} {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {what} {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory for {what}"))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {what} {}", path.display()))
}

/// Payment files carry the secret nonce
pub fn write_private_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory for {what}"))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    write_owner_only(path, json.as_bytes()).with_context(|| format!("Failed to write {what} {}", path.display()))
}

/// Write `contents` to a file that is mode 0600 before any byte lands in it
pub fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let mut file = options.open(path)?;
        // mode() only applies on creation; narrow a pre-existing file too
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(contents)?;
        file.sync_all()
    }

    #[cfg(not(unix))]
    {
        let mut file = options.open(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }
}

/// All announcements; a missing log is empty
pub fn load_announcements(path: &Path) -> Result<Vec<Announcement>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_json(path, "announcement log")
}

pub fn append_announcement(path: &Path, announcement: Announcement) -> Result<()> {
    let mut log = load_announcements(path)?;
    if log.iter().any(|a| a.stealth_address == announcement.stealth_address) {
        bail!("Stealth address {} is already announced", announcement.stealth_address);
    }
    log.push(announcement);
    write_json(path, &log, "announcement log")
}

/// Attach the dispatch transaction to an earlier announcement
pub fn set_announcement_transaction(path: &Path, stealth_address: Address, tx_hash: B256) -> Result<()> {
    let mut log = load_announcements(path)?;
    let entry = log
        .iter_mut()
        .find(|a| a.stealth_address == stealth_address)
        .with_context(|| format!("Stealth address {stealth_address} is not in the announcement log"))?;
    entry.transaction_hash = Some(tx_hash);
    write_json(path, &log, "announcement log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealth_payroll::KeyPair;
    use tempfile::tempdir;

    #[cfg(unix)]
    #[test]
    fn test_private_write_narrows_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("payment.json");
        fs::write(&path, "old contents that are longer than the new ones").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_private_json(&path, &vec![1u64, 2, 3], "payment file").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let back: Vec<u64> = read_json(&path, "payment file").unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[cfg(unix)]
    #[test]
    fn test_private_write_creates_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("payment.json");
        write_owner_only(&path, b"secret").unwrap_err();

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        write_owner_only(&path, b"secret").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(fs::read(&path).unwrap(), b"secret");
    }

    #[test]
    fn test_announcement_log_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("announcements.json");
        assert!(load_announcements(&path).unwrap().is_empty());

        let first = KeyPair::generate().unwrap();
        let second = KeyPair::generate().unwrap();
        append_announcement(&path, Announcement::new(first.public_key(), first.address(), None, None)).unwrap();
        append_announcement(&path, Announcement::new(second.public_key(), second.address(), None, None)).unwrap();

        let log = load_announcements(&path).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].ephemeral_key().unwrap(), *second.public_key());
    }

    #[test]
    fn test_duplicate_stealth_address_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("announcements.json");
        let pair = KeyPair::generate().unwrap();

        append_announcement(&path, Announcement::new(pair.public_key(), pair.address(), None, None)).unwrap();
        let err = append_announcement(&path, Announcement::new(pair.public_key(), pair.address(), None, None));
        assert!(err.is_err());
        assert_eq!(load_announcements(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_read_json_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proof.json");
        fs::write(&path, "not json").unwrap();

        let err = read_json::<ProofBundle>(&path, "proof bundle").unwrap_err();
        assert!(err.to_string().contains("proof bundle"));
    }
}
