//! Scan the announcement log for incoming payments
//!
//! Needs only the viewing key: either the stored identity or an exported
//! `vk:0x…` key, so an auditor can run it without spending power.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use k256::{PublicKey, SecretKey};
use stealth_payroll::StealthAddressProtocol;
use tracing::warn;

use super::export_view_key::ViewingKey;
use super::{heading, Session};
use crate::artifacts::{load_announcements, Announcement};

pub struct ScanOptions {
    /// Announcement log; the configured one if absent
    pub announcements: Option<PathBuf>,
    /// Exported viewing key instead of the stored identity
    pub view_key: Option<String>,
}

/// Announcements addressed to the holder of `view_secret` / `spend_public`.
/// Malformed entries are skipped.
pub fn scan_announcements<'a>(
    view_secret: &SecretKey,
    spend_public: &PublicKey,
    announcements: &'a [Announcement],
) -> Vec<&'a Announcement> {
    let protocol = StealthAddressProtocol::default();
    announcements
        .iter()
        .filter(|announcement| {
            let check = announcement.ephemeral_key().and_then(|ephemeral| {
                protocol
                    .is_payment_for(view_secret, spend_public, &ephemeral, &announcement.stealth_address)
                    .context("scan failed")
            });
            match check {
                Ok(mine) => mine,
                Err(e) => {
                    warn!(address = %announcement.stealth_address, error = %e, "skipping malformed announcement");
                    false
                }
            }
        })
        .collect()
}

pub fn run(session: &Session, options: ScanOptions) -> Result<()> {
    println!("{}", "Scanning for incoming stealth payments...".cyan());

    let viewing_key = match options.view_key {
        Some(ref text) => text.parse::<ViewingKey>()?,
        None => ViewingKey::from_identity(&session.storage().unlock()?),
    };

    let path = options
        .announcements
        .unwrap_or_else(|| session.config.announcements_path.clone());
    let announcements = load_announcements(&path)?;
    println!("Found {} announcements, scanning...", announcements.len());

    let found = scan_announcements(&viewing_key.view_secret, &viewing_key.spend_public, &announcements);

    if found.is_empty() {
        println!();
        println!("{}", "No payments found for your keys.".yellow());
        return Ok(());
    }

    heading(&format!("Found {} payment(s)", found.len()));
    for (i, announcement) in found.iter().enumerate() {
        println!("{}", format!("Payment #{}", i + 1).green().bold());
        println!("  Stealth address: {}", announcement.stealth_address);
        if let Some(commitment) = announcement.commitment {
            println!("  Commitment:      {}", commitment);
        }
        if let Some(hash) = announcement.transaction_hash {
            println!("  Transaction:     {}", hash);
        }
        println!("  Announced:       {}", announcement.created_at);
        println!();
    }
    println!(
        "{}",
        "Use 'stealthpay recover --address <ADDRESS>' to derive the spending key.".dimmed()
    );

    Ok(())
}
