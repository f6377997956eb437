//! Enroll a recipient's keys with the organisation contract

use anyhow::Result;
use colored::Colorize;
use stealth_payroll::crypto::keys::public_key_coordinates;
use stealth_payroll::ledger::OrganisationContract;

use super::{heading, signer_key, Session};

pub async fn run(session: &Session, recipient: Option<String>) -> Result<()> {
    let meta = session.recipient(recipient.as_deref())?;
    // reject uncommittable keys before paying for a transaction
    let view = public_key_coordinates(&meta.view)?;
    let spend = public_key_coordinates(&meta.spend)?;

    let organisation = OrganisationContract::connect_with_signer(
        session.rpc_url(),
        &signer_key()?,
        session.config.require_organisation()?,
    )?;
    println!("{}", format!("Enrolling {} with {}...", meta, organisation.address()).cyan());

    let tx_hash = organisation.enroll_keys(&view, &spend).await?;

    heading("Recipient Enrolled");
    println!("  View key X:  {}", view.x);
    println!("  View key Y:  {}", view.y);
    println!("  Spend key X: {}", spend.x);
    println!("  Spend key Y: {}", spend.y);
    println!("  Transaction: {}", tx_hash);

    Ok(())
}
