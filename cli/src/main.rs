//! Stealth Payroll CLI - operator interface for private payroll payments

use std::path::PathBuf;
use std::process::ExitCode;

use alloy::primitives::{Address, B256};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use stealth_payroll::PayrollError;
use tracing_subscriber::EnvFilter;

mod artifacts;
mod commands;
mod config;
mod secure_storage;




use commands::*;
use config::{CliConfig, ConfigUpdate};

#[derive(Parser)]
#[command(name = "stealthpay")]
#[command(version)]
#[command(about = "Private payroll over stealth addresses and zero-knowledge commitments")]
#[command(long_about = r#"
stealthpay pays employees at one-time stealth addresses and proves, in zero
knowledge, that each payment commitment is well formed.

Employee:
  1. stealthpay keygen           Generate view and spend keys
  2. stealthpay address          Share the meta-address with your employer
  3. stealthpay scan             Find incoming payments
  4. stealthpay recover          Derive the key of a stealth address
  5. stealthpay withdraw         Sweep a payment to an address you control

Employer:
  1. stealthpay enroll           Enroll an employee's keys on chain
  2. stealthpay commit           Commit to a payment
  3. stealthpay prove            Prove the commitment
  4. stealthpay send             Dispatch the payment to a stealth address
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file [default: ~/.stealth-payroll/config.json]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Encrypted key file [default: ~/.stealth-payroll/keys.enc]
    #[arg(long, global = true)]
    keys: Option<PathBuf>,

    /// JSON-RPC URL (overrides the config file)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new view and spend key pairs
    Keygen {
        /// Force overwrite existing keys
        #[arg(short, long)]
        force: bool,

        /// Generate random keys without a recovery phrase
        #[arg(long)]
        no_mnemonic: bool,

        /// Import from existing recovery phrase
        #[arg(long)]
        import_mnemonic: Option<String>,

        /// Passphrase for mnemonic (optional extra security)
        #[arg(long)]
        passphrase: Option<String>,
    },

    /// Re-encrypt stored keys under a new password
    ChangePassword,

    /// Show your meta-address and enrollment coordinates
    Address,

    /// Export view key (scan-only, no spending capability)
    ExportViewKey,

    /// Commit to a payment
    Commit {
        /// Recipient meta-address (default: your own)
        #[arg(short, long)]
        to: Option<String>,

        /// Amount in the token's smallest unit
        #[arg(short, long)]
        amount: String,

        /// 1 = one-time, 2 = recurring
        #[arg(long, default_value_t = 2)]
        payment_type: u64,

        /// Period start, unix seconds (default: now)
        #[arg(long)]
        start: Option<u64>,

        /// Period end, unix seconds (default: start + 30 days)
        #[arg(long)]
        end: Option<u64>,

        /// Secret nonce, decimal (default: random)
        #[arg(long)]
        nonce: Option<String>,

        /// Output payment file
        #[arg(short, long, default_value = "payment.json")]
        out: PathBuf,
    },

    /// Prove a payment commitment
    Prove {
        /// Payment file from 'commit'
        #[arg(short, long, default_value = "payment.json")]
        payment: PathBuf,

        #[arg(short, long, value_enum, default_value_t = prove::Backend::Arkworks)]
        backend: prove::Backend,

        /// Output proof bundle
        #[arg(short, long, default_value = "proof.json")]
        out: PathBuf,

        /// Per-attempt timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Verify a proof bundle
    Verify {
        #[arg(short, long, default_value = "proof.json")]
        proof: PathBuf,

        /// Call the verifier contract instead of verifying locally
        #[arg(long)]
        onchain: bool,

        /// Verifying key file from 'setup'
        #[arg(long)]
        verifying_key: Option<PathBuf>,
    },

    /// Generate development circuit keys for the in-process prover
    Setup {
        /// Output directory
        #[arg(short, long, default_value = "circuit-keys")]
        out: PathBuf,
    },

    /// Dispatch a proven payment to a fresh stealth address
    Send {
        #[arg(short, long, default_value = "payment.json")]
        payment: PathBuf,

        #[arg(long, default_value = "proof.json")]
        proof: PathBuf,

        /// Employee id assigned at enrollment
        #[arg(long)]
        employee_id: u64,

        /// ERC-20 token address
        #[arg(long)]
        token: Address,

        /// Derive and announce the address without sending a transaction
        #[arg(long)]
        offline: bool,
    },

    /// Scan the announcement log for incoming payments
    Scan {
        /// Announcement log (default: from config)
        #[arg(long)]
        announcements: Option<PathBuf>,

        /// Exported view key (vk:0x...) instead of your stored keys
        #[arg(long)]
        view_key: Option<String>,
    },

    /// Recover the private key of a stealth address
    Recover {
        #[arg(short, long)]
        address: Address,

        /// Ephemeral public key (default: from the announcement log)
        #[arg(long)]
        ephemeral: Option<String>,

        /// Print the recovered private key
        #[arg(long)]
        reveal: bool,
    },

    /// Sweep a stealth address's token balance to another address
    Withdraw {
        /// Stealth address holding the payment
        #[arg(short, long)]
        address: Address,

        /// ERC-20 token address
        #[arg(long)]
        token: Address,

        /// Destination address
        #[arg(long)]
        to: Address,

        /// Ephemeral public key (default: from the announcement log)
        #[arg(long)]
        ephemeral: Option<String>,
    },

    /// Enroll a recipient's keys with the organisation contract
    Enroll {
        /// Recipient meta-address (default: your own)
        #[arg(short, long)]
        to: Option<String>,
    },

    /// Record the settlement transaction of a commitment
    Settle {
        #[arg(short, long)]
        commitment: String,

        #[arg(long)]
        tx_hash: B256,

        /// Record on the organisation contract instead of the local ledger
        #[arg(long)]
        onchain: bool,
    },

    /// Look up a settlement (lists the local ledger without a commitment)
    Lookup {
        #[arg(short, long)]
        commitment: Option<String>,

        #[arg(long)]
        onchain: bool,
    },

    /// Show configuration and key info
    Info,

    /// View or change configuration
    Config {
        #[arg(long)]
        set_rpc_url: Option<String>,
        #[arg(long)]
        verifier: Option<Address>,
        #[arg(long)]
        organisation: Option<Address>,
        #[arg(long)]
        snarkjs: Option<PathBuf>,
        #[arg(long)]
        circuit_wasm: Option<PathBuf>,
        #[arg(long)]
        circuit_zkey: Option<PathBuf>,
        #[arg(long)]
        circuit_keys: Option<PathBuf>,
        #[arg(long)]
        ledger: Option<PathBuf>,
        #[arg(long)]
        announcements: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Name the protocol phase that failed when the cause is a payroll error
fn report(err: &anyhow::Error) {
    let phase = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<PayrollError>())
        .map(PayrollError::phase);
    match phase {
        Some(phase) => eprintln!("{} {:#}", format!("{phase} failed:").red().bold(), err),
        None => eprintln!("{} {:#}", "error:".red().bold(), err),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let keys_path = match cli.keys {
        Some(path) => path,
        None => config::default_keys_path()?,
    };
    let mut session = Session::new(CliConfig::load(&config_path)?, config_path, keys_path, cli.rpc_url);

    match cli.command {
        Commands::Keygen { force, no_mnemonic, import_mnemonic, passphrase } => {
            keygen::run(
                &session,
                keygen::KeygenOptions { force, with_mnemonic: !no_mnemonic, import_mnemonic, passphrase },
            )?;
        }
        Commands::ChangePassword => {
            keygen::run_change_password(&session)?;
        }
        Commands::Address => {
            address::run(&session)?;
        }
        Commands::ExportViewKey => {
            export_view_key::run(&session)?;
        }
        Commands::Commit { to, amount, payment_type, start, end, nonce, out } => {
            commit::run(
                &session,
                commit::CommitOptions {
                    recipient: to,
                    amount,
                    payment_type,
                    start_date: start,
                    end_date: end,
                    nonce,
                    out,
                },
            )?;
        }
        Commands::Prove { payment, backend, out, timeout } => {
            prove::run(&session, prove::ProveOptions { payment, backend, out, timeout_secs: timeout }).await?;
        }
        Commands::Verify { proof, onchain, verifying_key } => {
            verify::run(&session, verify::VerifyOptions { proof, onchain, verifying_key }).await?;
        }
        Commands::Setup { out } => {
            setup::run(&mut session, out)?;
        }
        Commands::Send { payment, proof, employee_id, token, offline } => {
            send::run(&session, send::SendOptions { payment, proof, employee_id, token, offline }).await?;
        }
        Commands::Scan { announcements, view_key } => {
            scan::run(&session, scan::ScanOptions { announcements, view_key })?;
        }
        Commands::Recover { address, ephemeral, reveal } => {
            recover::run(&session, recover::RecoverOptions { address, ephemeral, reveal })?;
        }
        Commands::Withdraw { address, token, to, ephemeral } => {
            withdraw::run(&session, withdraw::WithdrawOptions { address, ephemeral, token, to }).await?;
        }
        Commands::Enroll { to } => {
            enroll::run(&session, to).await?;
        }
        Commands::Settle { commitment, tx_hash, onchain } => {
            settle::run_settle(&session, &commitment, tx_hash, onchain).await?;
        }
        Commands::Lookup { commitment, onchain } => {
            settle::run_lookup(&session, commitment.as_deref(), onchain).await?;
        }
        Commands::Info => {
            info::run(&session).await?;
        }
        Commands::Config {
            set_rpc_url,
            verifier,
            organisation,
            snarkjs,
            circuit_wasm,
            circuit_zkey,
            circuit_keys,
            ledger,
            announcements,
        } => {
            configure::run(
                &mut session,
                ConfigUpdate {
                    rpc_url: set_rpc_url,
                    verifier_address: verifier,
                    organisation_address: organisation,
                    snarkjs_binary: snarkjs,
                    circuit_wasm,
                    circuit_zkey,
                    circuit_keys,
                    ledger_path: ledger,
                    announcements_path: announcements,
                },
            )?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
