//! Pay a recipient at a fresh stealth address
//!
//! The announcement (ephemeral key, address, commitment) is written before
//! anything is sent, so a payment that leaves the wallet can always be
//! found by its recipient. The transaction hash is attached afterwards.

use std::path::{Path, PathBuf};

use alloy::primitives::{Address, B256, U256};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use stealth_payroll::crypto::keys::public_key_hex;
use stealth_payroll::ledger::contract::DispatchRequest;
use stealth_payroll::ledger::{JsonFileLedger, OrganisationContract};
use stealth_payroll::{
    to_contract_call_arguments, Commitment, RecordOutcome, SettlementLedger, StealthAddress,
    StealthAddressProtocol,
};
use tracing::warn;

use super::{heading, signer_key, Session};
use crate::artifacts::{
    append_announcement, read_json, set_announcement_transaction, Announcement, PaymentFile, ProofBundle,
};

pub struct SendOptions {
    pub payment: PathBuf,
    pub proof: PathBuf,
    pub employee_id: u64,
    /// ERC-20 token to pay in
    pub token: Address,
    /// Derive and announce the address without touching the chain
    pub offline: bool,
}

/// Check the proof belongs to the payment, then derive a one-time address
pub fn prepare_payment(payment: &PaymentFile, bundle: &ProofBundle) -> Result<StealthAddress> {
    if bundle.public_signals.commitment() != payment.commitment {
        bail!(
            "Proof commits to {} but the payment file commits to {}",
            bundle.public_signals.commitment(),
            payment.commitment
        );
    }
    let recipient = payment.recipient()?;
    Ok(StealthAddressProtocol::default().generate_stealth_address(&recipient.view, &recipient.spend)?)
}

/// Bookkeeping after funds moved; each step is attempted regardless of the other
pub struct DispatchRecord {
    pub announcement: Result<()>,
    pub settlement: Result<RecordOutcome>,
}

pub async fn record_dispatch<L: SettlementLedger>(
    ledger: &L,
    announcements: &Path,
    stealth_address: Address,
    commitment: Commitment,
    tx_hash: B256,
) -> DispatchRecord {
    let announcement = set_announcement_transaction(announcements, stealth_address, tx_hash);
    let settlement = ledger
        .record_settlement(commitment, tx_hash)
        .await
        .map_err(anyhow::Error::from);
    DispatchRecord { announcement, settlement }
}

pub async fn run(session: &Session, options: SendOptions) -> Result<()> {
    let payment: PaymentFile = read_json(&options.payment, "payment file")?;
    let bundle: ProofBundle = read_json(&options.proof, "proof bundle")?;
    let stealth = prepare_payment(&payment, &bundle)?;
    let announcements = &session.config.announcements_path;

    append_announcement(
        announcements,
        Announcement::new(&stealth.ephemeral_public_key, stealth.stealth_address, Some(payment.commitment), None),
    )
    .context("Could not write the announcement; nothing was sent")?;

    println!("{}", format!("Paying stealth address {}", stealth.stealth_address).cyan());

    let mut record = None;
    if !options.offline {
        let organisation = OrganisationContract::connect_with_signer(
            session.rpc_url(),
            &signer_key()?,
            session.config.require_organisation()?,
        )?;
        let request = DispatchRequest {
            employee_id: U256::from(options.employee_id),
            token: options.token,
            amount: payment.parameters.amount,
            stealth_address: stealth.stealth_address,
        };
        let args = to_contract_call_arguments(&bundle.proof);
        let tx_hash = organisation
            .dispatch_payment(&request, &args, &bundle.public_signals)
            .await
            .context("Dispatch failed; the announcement stays in the log without a transaction")?;

        let ledger = JsonFileLedger::new(&session.config.ledger_path);
        let outcome = record_dispatch(&ledger, announcements, stealth.stealth_address, payment.commitment, tx_hash).await;
        record = Some((tx_hash, outcome));
    }

    heading("Payment Sent");
    println!("  Stealth address: {}", stealth.stealth_address);
    println!("  Ephemeral key:   {}", public_key_hex(&stealth.ephemeral_public_key));
    println!("  Commitment:      {}", payment.commitment);

    let Some((tx_hash, outcome)) = record else {
        println!("  Transaction:     {}", "(offline, nothing sent)".dimmed());
        println!();
        println!(
            "{}",
            "The recipient needs the ephemeral key to find this payment; it is in the announcement log.".dimmed()
        );
        return Ok(());
    };

    println!("  Transaction:     {}", tx_hash);
    println!();

    if let Err(err) = &outcome.announcement {
        warn!(error = %err, "announcement log not updated with transaction");
        println!(
            "{}",
            format!("Warning: the announcement log was not updated with the transaction ({err:#}).").yellow()
        );
    }

    match outcome.settlement {
        Ok(RecordOutcome::Recorded) => Ok(()),
        Ok(RecordOutcome::AlreadyRecorded) => {
            warn!(commitment = %payment.commitment, "settlement already recorded");
            Ok(())
        }
        Err(err) => Err(err.context(format!(
            "Payment was sent in {tx_hash} but the settlement was not recorded; \
             retry with 'stealthpay settle --commitment {} --tx-hash {tx_hash}'",
            payment.commitment
        ))),
    }
}
