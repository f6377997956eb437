//! Display the meta-address and enrollment coordinates

use anyhow::Result;
use colored::Colorize;
use stealth_payroll::crypto::keys::{address_from_public_key, public_key_coordinates, public_key_hex};

use super::{heading, Session};

pub fn run(session: &Session) -> Result<()> {
    let meta = session.storage().meta_address()?;

    heading("Your Stealth Meta-Address");
    println!("{}", meta);
    println!();
    println!("{}:", "Components".dimmed());
    println!("  View pubkey:   {}", public_key_hex(&meta.view));
    println!("  Spend pubkey:  {}", public_key_hex(&meta.spend));
    println!("  View address:  {}", address_from_public_key(&meta.view));
    println!("  Spend address: {}", address_from_public_key(&meta.spend));
    println!();

    println!("{}:", "Enrollment coordinates".cyan());
    for (label, key) in [("view", &meta.view), ("spend", &meta.spend)] {
        match public_key_coordinates(key) {
            Ok(coords) => {
                println!("  {label} X: {}", coords.x);
                println!("  {label} Y: {}", coords.y);
            }
            Err(e) => println!("  {}", format!("{label} key cannot be enrolled: {e}").red()),
        }
    }
    println!();
    println!("{}", "Share the meta-address above to receive private payments.".dimmed());

    Ok(())
}
