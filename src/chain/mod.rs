//! Solana ledger access and chain types.
//!
//! # Key Types
//!
//! - [`Address`] - A Solana public key (base58-encoded)
//! - [`Asset`] - Native SOL or an SPL [`TokenAsset`]
//! - [`TransactionRecord`] - Normalized view of a confirmed transaction
//! - [`LedgerClient`] - The seam through which transactions and balances are read
//! - [`SolanaRpcLedger`] - [`LedgerClient`] over Solana JSON-RPC

pub mod ledger;
pub mod record;
pub mod rpc;
pub mod types;

pub use ledger::*;
pub use record::{AccountKey, Instruction, InstructionKind, TokenTransferInstruction, TransactionRecord};
pub use rpc::*;
pub use types::*;
