//! Encrypted key storage for the payroll identity
//!
//! The view and spend secrets are sealed with AES-256-GCM under a key
//! derived by Argon2id. The meta-address is kept beside the ciphertext in
//! plaintext so public commands (`address`, `enroll`) never need the password.

use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, bail, Context, Result};
use argon2::{
    password_hash::{rand_core::RngCore, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use serde::{Deserialize, Serialize};
use stealth_payroll::{IdentityKeys, MetaAddress};
use zeroize::{Zeroize, Zeroizing};

use crate::artifacts::write_owner_only;

/// Argon2 parameters for key derivation
const ARGON2_M_COST: u32 = 65536; // 64 MB memory
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

const FILE_VERSION: u8 = 1;

/// Read instead of prompting when set (scripted use)
pub const PASSWORD_ENV: &str = "STEALTHPAY_PASSWORD";

/// On-disk key file
#[derive(Serialize, Deserialize)]
pub struct EncryptedKeyFile {
    pub version: u8,
    /// Shareable `st:eth:0x…` form of the two public keys
    pub meta_address: String,
    /// Salt for Argon2
    pub salt: String,
    /// Nonce for AES-GCM (base64)
    pub nonce: String,
    /// Encrypted [`KeyData`] (base64)
    pub ciphertext: String,
    pub password_hash: Option<String>,
    pub created_at: String,
}

/// Decrypted secrets (internal use only)
#[derive(Serialize, Deserialize, Zeroize)]
#[zeroize(drop)]
pub struct KeyData {
    pub view_secret: [u8; 32],
    pub spend_secret: [u8; 32],
}

impl KeyData {
    pub fn from_identity(keys: &IdentityKeys) -> Self {
        let (view, spend) = keys.export_secrets();
        Self { view_secret: *view, spend_secret: *spend }
    }

    pub fn to_identity(&self) -> Result<IdentityKeys> {
        IdentityKeys::from_secrets(&self.view_secret, &self.spend_secret)
            .context("Stored key material is invalid")
    }
}

fn argon2() -> Result<Argon2<'static>> {
    let params = argon2::Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(32))
        .map_err(|e| anyhow!("Argon2 params error: {}", e))?;
    Ok(Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
}

fn cipher_for(argon2: &Argon2<'_>, password: &str, salt: &str) -> Result<Aes256Gcm> {
    let mut key_bytes = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut key_bytes[..])
        .map_err(|e| anyhow!("Key derivation failed: {}", e))?;
    Aes256Gcm::new_from_slice(&key_bytes[..]).map_err(|e| anyhow!("Cipher creation failed: {}", e))
}

impl EncryptedKeyFile {
    pub fn encrypt(data: &KeyData, meta_address: &MetaAddress, password: &str) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = argon2()?;
        let cipher = cipher_for(&argon2, password, salt.as_str())?;

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let plaintext = Zeroizing::new(serde_json::to_vec(data)?);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .ok()
            .map(|h| h.to_string());

        Ok(Self {
            version: FILE_VERSION,
            meta_address: meta_address.to_string(),
            salt: salt.as_str().to_string(),
            nonce: b64::encode(&nonce_bytes),
            ciphertext: b64::encode(&ciphertext),
            password_hash,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn decrypt(&self, password: &str) -> Result<KeyData> {
        if self.version != FILE_VERSION {
            bail!("Unsupported key file version {}", self.version);
        }

        if let Some(ref hash) = self.password_hash {
            let parsed_hash =
                argon2::PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash: {}", e))?;
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .map_err(|_| anyhow!("Invalid password"))?;
        }

        let cipher = cipher_for(&argon2()?, password, &self.salt)?;

        let nonce_bytes = b64::decode(&self.nonce).context("Invalid nonce encoding")?;
        let ciphertext = b64::decode(&self.ciphertext).context("Invalid ciphertext encoding")?;
        let nonce_array: [u8; 12] = nonce_bytes
            .try_into()
            .map_err(|_| anyhow!("Invalid nonce length"))?;

        let plaintext = Zeroizing::new(
            cipher
                .decrypt(&Nonce::from(nonce_array), ciphertext.as_ref())
                .map_err(|_| anyhow!("Decryption failed - wrong password or corrupted data"))?,
        );

        serde_json::from_slice(&plaintext).context("Failed to parse decrypted key data")
    }

    pub fn meta_address(&self) -> Result<MetaAddress> {
        self.meta_address
            .parse()
            .context("Key file holds an invalid meta-address")
    }
}

/// Encrypted key file manager
pub struct SecureKeyStorage {
    path: PathBuf,
}

impl SecureKeyStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save(&self, keys: &IdentityKeys, password: &str) -> Result<()> {
        let encrypted = EncryptedKeyFile::encrypt(&KeyData::from_identity(keys), &keys.meta_address(), password)?;
        let json = serde_json::to_string_pretty(&encrypted)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create key directory")?;
        }

        write_owner_only(&self.path, json.as_bytes())
            .with_context(|| format!("Failed to write key file {}", self.path.display()))
    }

    pub fn read_file(&self) -> Result<EncryptedKeyFile> {
        if !self.exists() {
            bail!("No payroll keys found. Run 'stealthpay keygen' first.");
        }
        let json = fs::read_to_string(&self.path).context("Failed to read encrypted key file")?;
        serde_json::from_str(&json).context("Failed to parse encrypted key file")
    }

    /// Public keys only; needs no password
    pub fn meta_address(&self) -> Result<MetaAddress> {
        self.read_file()?.meta_address()
    }

    pub fn load(&self, password: &str) -> Result<IdentityKeys> {
        let file = self.read_file()?;
        let keys = file.decrypt(password)?.to_identity()?;
        if keys.meta_address() != file.meta_address()? {
            bail!("Key file is inconsistent: secrets do not match the stored meta-address");
        }
        Ok(keys)
    }

    /// Prompt for the password (or read it from the environment) and decrypt
    pub fn unlock(&self) -> Result<IdentityKeys> {
        // fail on a missing file before prompting
        self.read_file()?;
        let password = read_password("Enter password to decrypt keys: ")?;
        self.load(&password).context("Failed to decrypt keys. Wrong password?")
    }

    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let keys = self.load(old_password)?;
        self.save(&keys, new_password)
    }
}

/// Password strength validation
pub fn validate_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        bail!("Password must be at least 8 characters");
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_numeric());

    if !has_upper || !has_lower || !has_digit {
        bail!("Password must contain uppercase, lowercase, and numeric characters");
    }

    Ok(())
}

/// Password from `STEALTHPAY_PASSWORD`, else a hidden prompt
pub fn read_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(password));
    }
    rpassword::prompt_password(prompt)
        .map(Zeroizing::new)
        .context("Failed to read password")
}

/// New password with confirmation
pub fn read_new_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        validate_password_strength(&password)?;
        return Ok(Zeroizing::new(password));
    }

    let password = Zeroizing::new(rpassword::prompt_password(prompt).context("Failed to read password")?);
    let confirm = Zeroizing::new(rpassword::prompt_password("Confirm password: ").context("Failed to read password")?);
    if *password != *confirm {
        bail!("Passwords do not match");
    }

    validate_password_strength(&password)?;
    Ok(password)
}

// Base64 encoding/decoding helpers
mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};

    pub fn encode(data: &[u8]) -> String {
        STANDARD.encode(data)
    }

    pub fn decode(s: &str) -> anyhow::Result<Vec<u8>> {
        STANDARD.decode(s).map_err(|e| anyhow::anyhow!("Base64 decode error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PASSWORD: &str = "TestPassword123";

    fn data() -> KeyData {
        KeyData { view_secret: [0x42; 32], spend_secret: [0x43; 32] }
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let keys = data().to_identity().unwrap();
        let encrypted = EncryptedKeyFile::encrypt(&data(), &keys.meta_address(), PASSWORD).unwrap();
        let decrypted = encrypted.decrypt(PASSWORD).unwrap();

        assert_eq!(decrypted.view_secret, [0x42; 32]);
        assert_eq!(decrypted.spend_secret, [0x43; 32]);
        assert_eq!(encrypted.meta_address().unwrap(), keys.meta_address());
    }

    #[test]
    fn test_wrong_password_fails() {
        let keys = data().to_identity().unwrap();
        let encrypted = EncryptedKeyFile::encrypt(&data(), &keys.meta_address(), PASSWORD).unwrap();
        assert!(encrypted.decrypt("WrongPassword123").is_err());
    }

    #[test]
    fn test_ciphertext_hides_secrets() {
        let keys = data().to_identity().unwrap();
        let encrypted = EncryptedKeyFile::encrypt(&data(), &keys.meta_address(), PASSWORD).unwrap();
        let json = serde_json::to_string(&encrypted).unwrap();

        assert!(!json.contains(&hex::encode([0x42u8; 32])));
        assert!(json.contains(&keys.meta_address().to_string()));
    }

    #[test]
    fn test_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = SecureKeyStorage::new(dir.path().join("keys.enc"));
        let keys = IdentityKeys::generate().unwrap();

        storage.save(&keys, PASSWORD).unwrap();
        assert_eq!(storage.meta_address().unwrap(), keys.meta_address());

        let loaded = storage.load(PASSWORD).unwrap();
        assert_eq!(loaded.meta_address(), keys.meta_address());
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let storage = SecureKeyStorage::new(dir.path().join("keys.enc"));
        storage.save(&IdentityKeys::generate().unwrap(), PASSWORD).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_change_password() {
        let dir = tempdir().unwrap();
        let storage = SecureKeyStorage::new(dir.path().join("keys.enc"));
        let keys = IdentityKeys::generate().unwrap();
        storage.save(&keys, PASSWORD).unwrap();

        storage.change_password(PASSWORD, "NewPassword456").unwrap();

        assert!(storage.load(PASSWORD).is_err());
        assert_eq!(storage.load("NewPassword456").unwrap().meta_address(), keys.meta_address());
    }

    #[test]
    fn test_missing_file_mentions_keygen() {
        let dir = tempdir().unwrap();
        let storage = SecureKeyStorage::new(dir.path().join("absent.enc"));
        let err = storage.meta_address().unwrap_err();
        assert!(err.to_string().contains("keygen"));
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password_strength("short").is_err());
        assert!(validate_password_strength("alllowercase").is_err());
        assert!(validate_password_strength("ALLUPPERCASE").is_err());
        assert!(validate_password_strength("NoNumbers").is_err());
        assert!(validate_password_strength("ValidPass123").is_ok());
    }
}
