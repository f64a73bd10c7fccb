//! Challenge issuance and payment verification.
//!
//! - [`ChallengeBuilder`] turns a price into a `402 Payment Required` answer
//! - [`PaymentVerifier`] checks a transaction signature against the configured terms
//! - [`TransferExtractor`] finds the payment inside a transaction, per asset mode
//! - [`ReplayGuard`] remembers signatures that already paid for something
//! - [`PaymentGate`] combines the above into single-use redemption

pub mod challenge;
pub mod gate;
pub mod replay;
pub mod transfer;
pub mod verifier;

pub use challenge::ChallengeBuilder;
pub use gate::PaymentGate;
pub use replay::{InMemoryReplayGuard, ReplayGuard};
pub use transfer::TransferExtractor;
pub use verifier::PaymentVerifier;

use crate::chain::LedgerError;
use crate::config::ConfigError;
use crate::util::money_amount::MoneyAmountParseError;

/// Faults that keep the verifier from reaching a verdict.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("Ledger unavailable: {0}")]
    RpcUnavailable(#[from] LedgerError),
    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] MoneyAmountParseError),
}
