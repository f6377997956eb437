//! Settlement bookkeeping: commitment → transaction hash

use alloy::primitives::B256;
use anyhow::{Context, Result};
use colored::Colorize;
use stealth_payroll::ledger::{ContractLedger, JsonFileLedger, OrganisationContract};
use stealth_payroll::{Commitment, RecordOutcome, SettlementLedger};

use super::{heading, signer_key, Session};

pub fn parse_commitment(text: &str) -> Result<Commitment> {
    text.parse().context("Invalid commitment (decimal or 0x hex below the field modulus)")
}

pub async fn record<L: SettlementLedger>(ledger: &L, commitment: Commitment, tx_hash: B256) -> Result<RecordOutcome> {
    Ok(ledger.record_settlement(commitment, tx_hash).await?)
}

pub async fn run_settle(session: &Session, commitment: &str, tx_hash: B256, onchain: bool) -> Result<()> {
    let commitment = parse_commitment(commitment)?;

    let outcome = if onchain {
        let contract = OrganisationContract::connect_with_signer(
            session.rpc_url(),
            &signer_key()?,
            session.config.require_organisation()?,
        )?;
        record(&ContractLedger::new(contract), commitment, tx_hash).await?
    } else {
        record(&JsonFileLedger::new(&session.config.ledger_path), commitment, tx_hash).await?
    };

    match outcome {
        RecordOutcome::Recorded => println!("{}", format!("Recorded {commitment} → {tx_hash}").green()),
        RecordOutcome::AlreadyRecorded => println!("{}", format!("{commitment} was already recorded with {tx_hash}").yellow()),
    }
    Ok(())
}

pub async fn run_lookup(session: &Session, commitment: Option<&str>, onchain: bool) -> Result<()> {
    let Some(commitment) = commitment else {
        // no commitment: list the local ledger
        let ledger = JsonFileLedger::new(&session.config.ledger_path);
        let entries = ledger.entries().await?;
        heading(&format!("Settlement ledger ({} entries)", entries.len()));
        for (commitment, tx_hash) in entries {
            println!("  {commitment}");
            println!("    → {tx_hash}");
        }
        return Ok(());
    };

    let commitment = parse_commitment(commitment)?;
    let found = if onchain {
        let contract = OrganisationContract::connect(session.rpc_url(), session.config.require_organisation()?)?;
        ContractLedger::new(contract).lookup_settlement(commitment).await?
    } else {
        JsonFileLedger::new(&session.config.ledger_path).lookup_settlement(commitment).await?
    };

    match found {
        Some(tx_hash) => println!("{commitment} → {tx_hash}"),
        None => println!("{}", format!("No settlement recorded for {commitment}").yellow()),
    }
    Ok(())
}
