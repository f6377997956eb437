//! Export the viewing key (scan-only capability)
//!
//! A viewing key is the view secret plus the spend *public* key: enough to
//! recognise incoming payments, never enough to spend them.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use stealth_payroll::IdentityKeys;
use zeroize::Zeroizing;

use super::{heading, Session};

const VIEWING_KEY_PREFIX: &str = "vk:0x";

pub struct ViewingKey {
    pub view_secret: SecretKey,
    pub spend_public: PublicKey,
}

impl ViewingKey {
    pub fn from_identity(keys: &IdentityKeys) -> Self {
        Self {
            view_secret: keys.viewing.secret_key().clone(),
            spend_public: *keys.spending.public_key(),
        }
    }

    /// Text form; the caller must treat it as confidential
    pub fn encode(&self) -> Zeroizing<String> {
        let secret = Zeroizing::new(hex::encode(self.view_secret.to_bytes()));
        let spend = self.spend_public.to_encoded_point(true);
        Zeroizing::new(format!("{VIEWING_KEY_PREFIX}{}{}", secret.as_str(), hex::encode(spend.as_bytes())))
    }
}

impl FromStr for ViewingKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .trim()
            .strip_prefix(VIEWING_KEY_PREFIX)
            .with_context(|| format!("Viewing key must start with {VIEWING_KEY_PREFIX}"))?;
        let bytes = Zeroizing::new(hex::decode(body).map_err(|_| anyhow::anyhow!("Viewing key is not valid hex"))?);
        if bytes.len() != 65 {
            bail!("Viewing key must be 65 bytes, got {}", bytes.len());
        }
        let view_secret =
            SecretKey::from_slice(&bytes[..32]).map_err(|_| anyhow::anyhow!("Viewing key holds an invalid secret"))?;
        let spend_public = PublicKey::from_sec1_bytes(&bytes[32..])
            .map_err(|_| anyhow::anyhow!("Viewing key holds an invalid spend key"))?;
        Ok(Self { view_secret, spend_public })
    }
}

impl fmt::Debug for ViewingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewingKey")
            .field("view_secret", &"<redacted>")
            .field("spend_public", &self.spend_public)
            .finish()
    }
}

pub fn run(session: &Session) -> Result<()> {
    let keys = session.storage().unlock()?;
    let viewing_key = ViewingKey::from_identity(&keys);

    heading("View Key Export");
    println!("{}", "The view key allows scanning for payments WITHOUT spending capability.".dimmed());
    println!("{}", "Share this with accountants/auditors who need to see your payroll receipts.".dimmed());
    println!();
    println!("{}:", "View Key (view secret + spend pubkey)".yellow());
    println!();
    println!("  {}", viewing_key.encode().as_str());
    println!();
    println!("{}", "WARNING: Anyone with this key can see all your incoming payments!".red());
    println!("{}", "         They CANNOT spend your funds.".green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewing_key_text_round_trip() {
        let keys = IdentityKeys::generate().unwrap();
        let encoded = ViewingKey::from_identity(&keys).encode();

        let parsed: ViewingKey = encoded.parse().unwrap();
        assert_eq!(parsed.spend_public, *keys.spending.public_key());
        assert_eq!(parsed.view_secret.to_bytes(), keys.viewing.secret_key().to_bytes());
    }

    #[test]
    fn test_viewing_key_excludes_spend_secret() {
        let keys = IdentityKeys::generate().unwrap();
        let encoded = ViewingKey::from_identity(&keys).encode();
        let spend_secret = hex::encode(&keys.spending.export_secret()[..]);
        assert!(!encoded.contains(&spend_secret));
    }

    #[test]
    fn test_malformed_viewing_key_errors_do_not_echo_input() {
        let text = "vk:0xdeadbeef";
        let err = text.parse::<ViewingKey>().unwrap_err();
        assert!(!err.to_string().contains("deadbeef"));
        assert!("st:eth:0x00".parse::<ViewingKey>().is_err());
    }
}
