//! x402 payments on Solana for resource servers.
//!
//! The [x402 protocol](https://www.x402.org) answers a request for a paid resource with
//! `402 Payment Required` and a machine-readable description of the price. The client pays
//! on-chain and presents the transaction signature; the server checks the transaction on
//! the ledger before granting access.
//!
//! This crate implements the server side of that exchange for Solana, in two asset modes:
//!
//! - **SPL token** (e.g. USDC): the transaction must carry a `transfer` or `transferChecked`
//!   instruction into the recipient's associated token account, for at least the price.
//! - **Native SOL**: the recipient's lamport balance must have grown by the price, within a
//!   configurable tolerance.
//!
//! # Modules
//!
//! - [`chain`] - Solana addresses, assets, transaction records and ledger access.
//! - [`config`] - JSON configuration with environment variable indirection.
//! - [`networks`] - Known Solana clusters and token deployments.
//! - [`proto`] - Wire types: challenge documents and verification verdicts.
//! - [`scheme`] - Challenge builder, payment verifier, replay guard and payment gate.
//! - [`timestamp`] - Unix timestamps for block times and freshness checks.
//! - [`util`] - Money amounts and telemetry.
//!
//! # Example
//!
//! ```no_run
//! use x402_solana_gate::config::ServerConfig;
//! use x402_solana_gate::networks::SolanaNetwork;
//! use x402_solana_gate::scheme::PaymentGate;
//! use x402_solana_gate::util::MoneyAmount;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::new(SolanaNetwork::Devnet, "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM")
//!     .with_asset("usdc");
//! let gate = PaymentGate::from_config(&config)?;
//! let price = MoneyAmount::parse("0.01")?;
//!
//! let challenge = gate.challenge(&price, Some("article-42"))?;
//! assert_eq!(challenge.status.as_u16(), 402);
//!
//! let verdict = gate.redeem("5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW", &price).await?;
//! println!("{}", serde_json::to_string(&verdict)?);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod networks;
pub mod proto;
pub mod scheme;
pub mod timestamp;
pub mod util;
