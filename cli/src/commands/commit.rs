//! Build a payment commitment

use std::path::PathBuf;

use alloy::primitives::U256;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use stealth_payroll::crypto::poseidon::{
    CommitmentInputs, ONE_TIME_PAYMENT, RECURRING_PAYMENT, RECURRING_PERIOD_SECS,
};
use stealth_payroll::{build_commitment, MetaAddress, PaymentParameters, SecretNonce};

use super::{heading, Session};
use crate::artifacts::{write_private_json, PaymentFile};

pub struct CommitOptions {
    /// Recipient meta-address; our own if absent
    pub recipient: Option<String>,
    /// Amount in the token's smallest unit (decimal)
    pub amount: String,
    pub payment_type: u64,
    /// Unix seconds; now if absent
    pub start_date: Option<u64>,
    /// Unix seconds; one period after the start if absent
    pub end_date: Option<u64>,
    /// Decimal nonce; random if absent
    pub nonce: Option<String>,
    pub out: PathBuf,
}

pub fn parse_amount(amount: &str) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() || !amount.chars().all(|c| c.is_ascii_digit()) {
        bail!("Amount must be a non-negative integer in the token's smallest unit");
    }
    U256::from_str_radix(amount, 10).context("Amount does not fit in 256 bits")
}

pub fn payment_parameters(options: &CommitOptions, now: u64) -> Result<PaymentParameters> {
    if options.payment_type != ONE_TIME_PAYMENT && options.payment_type != RECURRING_PAYMENT {
        bail!(
            "Payment type must be {} (one-time) or {} (recurring)",
            ONE_TIME_PAYMENT,
            RECURRING_PAYMENT
        );
    }

    let start_date = options.start_date.unwrap_or(now);
    let end_date = match options.end_date {
        Some(end) => end,
        None => start_date
            .checked_add(RECURRING_PERIOD_SECS)
            .context("Start date too large")?,
    };
    if end_date < start_date {
        bail!("End date {} is before start date {}", end_date, start_date);
    }

    let secret_nonce = match options.nonce {
        Some(ref nonce) => SecretNonce::from_decimal(nonce).context("Invalid nonce")?,
        None => SecretNonce::random(),
    };

    Ok(PaymentParameters {
        amount: parse_amount(&options.amount)?,
        secret_nonce,
        payment_type: options.payment_type,
        start_date,
        end_date,
    })
}

pub fn build_payment(recipient: &MetaAddress, parameters: PaymentParameters) -> Result<PaymentFile> {
    let commitment = build_commitment(&parameters, &recipient.view, &recipient.spend)?;
    Ok(PaymentFile { recipient: recipient.to_string(), parameters, commitment })
}

pub fn run(session: &Session, options: CommitOptions) -> Result<()> {
    let recipient = session.recipient(options.recipient.as_deref())?;
    let now = u64::try_from(chrono::Utc::now().timestamp()).context("System clock before 1970")?;
    let parameters = payment_parameters(&options, now)?;

    let payment = build_payment(&recipient, parameters)?;
    write_private_json(&options.out, &payment, "payment file")?;

    heading("Payment Commitment");
    let inputs = CommitmentInputs::new(&payment.parameters, &recipient.view, &recipient.spend)?;
    for (name, value) in inputs.named() {
        // the nonce blinds the commitment; never print it
        if name == "secretNonce" {
            println!("  {:<14} {}", name, "<hidden>".dimmed());
        } else {
            println!("  {:<14} {}", name, value);
        }
    }
    println!();
    println!("{}:", "Commitment".cyan());
    println!("  {}", payment.commitment);
    println!("  {}", payment.commitment.to_b256());
    println!();
    println!(
        "{}",
        format!("Payment file (contains the secret nonce) saved to: {}", options.out.display()).dimmed()
    );

    Ok(())
}
