//! Show configuration and key info

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use stealth_payroll::ledger::JsonFileLedger;

use super::{heading, Session};
use crate::artifacts::load_announcements;

fn show_path(label: &str, path: Option<&Path>) {
    match path {
        Some(path) if path.exists() => println!("  {label:<14} {}", path.display()),
        Some(path) => println!("  {label:<14} {} {}", path.display(), "(missing)".red()),
        None => println!("  {label:<14} {}", "not set".dimmed()),
    }
}

pub async fn run(session: &Session) -> Result<()> {
    heading("Stealth Payroll Configuration");

    println!("{}:", "Config File".cyan());
    println!("  {}", session.config_path.display());
    println!();

    let storage = session.storage();
    match storage.read_file() {
        Ok(file) => {
            println!("{}", "Payroll Keys: CONFIGURED".green());
            println!("  Created: {}", file.created_at);
            println!("  Meta-address: {}", file.meta_address);
        }
        Err(_) => {
            println!("{}", "Payroll Keys: NOT CONFIGURED".red());
            println!("  Run 'stealthpay keygen' to generate keys");
        }
    }
    println!();

    println!("{}:", "RPC Endpoint".cyan());
    println!("  {}", session.rpc_url());
    println!();

    println!("{}:", "Contracts".cyan());
    let show = |address: Option<alloy::primitives::Address>| match address {
        Some(address) => address.to_string(),
        None => "not set".dimmed().to_string(),
    };
    println!("  Verifier:     {}", show(session.config.verifier_address));
    println!("  Organisation: {}", show(session.config.organisation_address));
    println!();

    println!("{}:", "Proving".cyan());
    println!("  {:<14} {}", "snarkjs", session.config.snarkjs_binary.display());
    show_path("circuit wasm", session.config.circuit_wasm.as_deref());
    show_path("circuit zkey", session.config.circuit_zkey.as_deref());
    show_path("circuit keys", session.config.circuit_keys.as_deref());
    println!();

    println!("{}:", "Bookkeeping".cyan());
    let settlements = JsonFileLedger::new(&session.config.ledger_path).entries().await;
    match settlements {
        Ok(entries) => println!("  Settlements:   {} ({})", entries.len(), session.config.ledger_path.display()),
        Err(e) => println!("  Settlements:   {}", format!("unreadable: {e}").red()),
    }
    match load_announcements(&session.config.announcements_path) {
        Ok(log) => println!("  Announcements: {} ({})", log.len(), session.config.announcements_path.display()),
        Err(e) => println!("  Announcements: {}", format!("unreadable: {e}").red()),
    }

    Ok(())
}
