//! x402 Solana payment gate command line.
//!
//! Commands:
//! - `challenge` - Print the `402 Payment Required` answer for a price
//! - `verify` - Verify and redeem one or more transaction signatures against a price
//! - `status` - Report confirmation depth of transaction signatures
//! - `balance` - Report the recipient's SOL balance
//!
//! Output is JSON on stdout; logs go to stderr.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `CONFIG` points at the JSON configuration file (default `config.json`)
//! - `RUST_LOG` controls log verbosity
//! - `OTEL_*` variables enable trace export to systems like Honeycomb

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde_json::{Value, json};
use std::path::PathBuf;
use x402_solana_gate::chain::{Commitment, LedgerClient, SOL_DECIMALS, SolanaRpcLedger};
use x402_solana_gate::config::ServerConfig;
use x402_solana_gate::scheme::{ChallengeBuilder, PaymentGate, PaymentVerifier};
use x402_solana_gate::util::{MoneyAmount, Telemetry};

/// CLI arguments for the x402 Solana payment gate.
#[derive(Parser, Debug)]
#[command(name = "x402-solana-gate")]
#[command(about = "Issue x402 payment challenges and verify Solana payments")]
struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(long, short, env = "CONFIG", default_value = "config.json", global = true)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the payment challenge for a price
    Challenge {
        /// Price in display units, e.g. `0.01`
        #[arg(long)]
        price: String,
        /// Identifier of the protected resource
        #[arg(long)]
        resource_id: Option<String>,
    },
    /// Verify transaction signatures against a price, consuming each valid one
    Verify {
        /// Price in display units, e.g. `0.01`
        #[arg(long)]
        price: String,
        /// Override the configured freshness window
        #[arg(long)]
        max_age_seconds: Option<u64>,
        /// Report ledger faults per signature instead of aborting
        #[arg(long)]
        continue_on_error: bool,
        #[arg(required = true)]
        signatures: Vec<String>,
    },
    /// Report whether signatures are confirmed and finalized
    Status {
        #[arg(long)]
        continue_on_error: bool,
        #[arg(required = true)]
        signatures: Vec<String>,
    },
    /// Report the recipient's SOL balance
    Balance,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    let _telemetry = Telemetry::new();

    let args = CliArgs::parse();
    let mut config = ServerConfig::load_from_path(args.config)?;

    let output = match args.command {
        Command::Challenge { price, resource_id } => {
            let price = MoneyAmount::parse(&price)?;
            let builder = ChallengeBuilder::new(&config)?;
            builder
                .build_response(&price, resource_id.as_deref())?
                .to_json()
        }
        Command::Verify {
            price,
            max_age_seconds,
            continue_on_error,
            signatures,
        } => {
            if let Some(max_age_seconds) = max_age_seconds {
                config = config.with_max_age_seconds(max_age_seconds);
            }
            let price = MoneyAmount::parse(&price)?;
            let gate = PaymentGate::from_config(&config)?;
            let mut results = Vec::with_capacity(signatures.len());
            for signature in signatures {
                match gate.redeem(&signature, &price).await {
                    Ok(verdict) => {
                        let mut value = serde_json::to_value(&verdict)?;
                        if let Value::Object(map) = &mut value {
                            map.entry("signature").or_insert(json!(signature));
                        }
                        results.push(value);
                    }
                    Err(err) if continue_on_error => {
                        tracing::warn!(%signature, %err, "verification failed");
                        results.push(json!({ "signature": signature, "error": err.to_string() }));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Value::Array(results)
        }
        Command::Status {
            continue_on_error,
            signatures,
        } => {
            let verifier = PaymentVerifier::from_config(&config)?;
            let mut results = Vec::with_capacity(signatures.len());
            for signature in signatures {
                match verifier.get_status(&signature).await {
                    Ok(status) => results.push(json!({
                        "signature": signature,
                        "confirmed": status.confirmed,
                        "finalized": status.finalized,
                    })),
                    Err(err) if continue_on_error => {
                        results.push(json!({ "signature": signature, "error": err.to_string() }))
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Value::Array(results)
        }
        Command::Balance => {
            let recipient = config.recipient()?;
            let settings = config.settings()?;
            let ledger = SolanaRpcLedger::new(config.rpc_url(), settings.rpc_timeout);
            let lamports = ledger
                .get_balance(&recipient, Commitment::Confirmed)
                .await?;
            let sol = MoneyAmount::from_base_units(lamports, SOL_DECIMALS)?;
            json!({
                "address": recipient,
                "lamports": lamports,
                "sol": sol.to_string(),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
