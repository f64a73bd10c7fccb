//! Ledger transaction records.
//!
//! [`TransactionRecord`] is the normalized, read-only view of a confirmed transaction that the
//! transfer extractors work on. It is decoded from the `jsonParsed` encoding of the
//! `getTransaction` RPC method, described here by the `Rpc*` wire types.

use serde::Deserialize;
use serde_json::Value;
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use std::str::FromStr;

use crate::chain::types::{Address, AddressParseError};
use crate::timestamp::UnixTimestamp;

/// One entry of a transaction's account list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub address: Address,
    pub signer: bool,
}

/// An SPL token `transfer` or `transferChecked` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransferInstruction {
    pub source: Address,
    pub destination: Address,
    pub authority: Option<Address>,
    /// Present for `transferChecked` only.
    pub mint: Option<Address>,
    /// Raw amount in base units.
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    TokenTransfer(TokenTransferInstruction),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub kind: InstructionKind,
}

/// A transaction as reported by the ledger at some commitment level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<UnixTimestamp>,
    /// On-chain execution error, rendered as reported by the node.
    pub error: Option<String>,
    pub account_keys: Vec<AccountKey>,
    /// Lamport balances before execution, aligned with `account_keys`.
    pub pre_balances: Vec<u64>,
    /// Lamport balances after execution, aligned with `account_keys`.
    pub post_balances: Vec<u64>,
    pub instructions: Vec<Instruction>,
}

impl TransactionRecord {
    /// The account that paid the fee: the first signer.
    pub fn fee_payer(&self) -> Option<&Address> {
        self.account_keys
            .iter()
            .find(|key| key.signer)
            .or_else(|| self.account_keys.first())
            .map(|key| &key.address)
    }

    pub fn account_index(&self, address: &Address) -> Option<usize> {
        self.account_keys
            .iter()
            .position(|key| key.address == *address)
    }

    /// Signed lamport change of the account at `index`, if both snapshots cover it.
    pub fn balance_delta(&self, index: usize) -> Option<i128> {
        let pre = *self.pre_balances.get(index)?;
        let post = *self.post_balances.get(index)?;
        Some(post as i128 - pre as i128)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordDecodeError {
    #[error(transparent)]
    Address(#[from] AddressParseError),
    #[error("Transaction carries no signatures")]
    MissingSignature,
}

// ============================================================================
// getTransaction wire format (jsonParsed)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcConfirmedTransaction {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: Option<RpcTransactionMeta>,
    pub transaction: RpcTransaction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub signatures: Vec<String>,
    pub message: RpcMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcMessage {
    pub account_keys: Vec<RpcAccountKey>,
    #[serde(default)]
    pub instructions: Vec<RpcInstruction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcAccountKey {
    pub pubkey: String,
    #[serde(default)]
    pub signer: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcInstruction {
    pub program_id: String,
    #[serde(default)]
    pub parsed: Option<Value>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedTransfer {
    source: String,
    destination: String,
    #[serde(default)]
    authority: Option<String>,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    amount: u64,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct ParsedTokenAmount {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedTransferChecked {
    source: String,
    destination: String,
    mint: String,
    #[serde(default)]
    authority: Option<String>,
    #[serde(default)]
    multisig_authority: Option<String>,
    token_amount: ParsedTokenAmount,
}

fn optional_address(value: Option<String>) -> Result<Option<Address>, AddressParseError> {
    value.map(|s| Address::from_str(&s)).transpose()
}

/// Decodes the `parsed` field of a token program instruction. Anything that is not a
/// well-formed transfer is reported as [`InstructionKind::Other`].
fn decode_parsed(parsed: &Value) -> Result<InstructionKind, RecordDecodeError> {
    let kind = parsed.get("type").and_then(Value::as_str);
    let info = parsed.get("info").cloned();
    let (Some(kind), Some(info)) = (kind, info) else {
        return Ok(InstructionKind::Other);
    };
    let transfer = match kind {
        "transfer" => match serde_json::from_value::<ParsedTransfer>(info) {
            Ok(t) => TokenTransferInstruction {
                source: t.source.parse()?,
                destination: t.destination.parse()?,
                authority: optional_address(t.authority)?,
                mint: None,
                amount: t.amount,
            },
            Err(_) => return Ok(InstructionKind::Other),
        },
        "transferChecked" => match serde_json::from_value::<ParsedTransferChecked>(info) {
            Ok(t) => TokenTransferInstruction {
                source: t.source.parse()?,
                destination: t.destination.parse()?,
                authority: optional_address(t.authority.or(t.multisig_authority))?,
                mint: Some(t.mint.parse()?),
                amount: t.token_amount.amount,
            },
            Err(_) => return Ok(InstructionKind::Other),
        },
        _ => return Ok(InstructionKind::Other),
    };
    Ok(InstructionKind::TokenTransfer(transfer))
}

impl TryFrom<RpcConfirmedTransaction> for TransactionRecord {
    type Error = RecordDecodeError;

    fn try_from(value: RpcConfirmedTransaction) -> Result<Self, Self::Error> {
        let signature = value
            .transaction
            .signatures
            .first()
            .cloned()
            .ok_or(RecordDecodeError::MissingSignature)?;
        let account_keys = value
            .transaction
            .message
            .account_keys
            .into_iter()
            .map(|key| {
                Ok(AccountKey {
                    address: key.pubkey.parse()?,
                    signer: key.signer,
                })
            })
            .collect::<Result<Vec<_>, RecordDecodeError>>()?;
        let instructions = value
            .transaction
            .message
            .instructions
            .into_iter()
            .map(|instruction| {
                let kind = match instruction.parsed.as_ref() {
                    Some(parsed) => decode_parsed(parsed)?,
                    None => InstructionKind::Other,
                };
                Ok(Instruction {
                    program_id: instruction.program_id.parse()?,
                    kind,
                })
            })
            .collect::<Result<Vec<_>, RecordDecodeError>>()?;
        let (error, pre_balances, post_balances) = match value.meta {
            Some(meta) => (
                meta.err.map(|err| err.to_string()),
                meta.pre_balances,
                meta.post_balances,
            ),
            None => (None, Vec::new(), Vec::new()),
        };
        Ok(TransactionRecord {
            signature,
            slot: value.slot,
            block_time: value.block_time.and_then(UnixTimestamp::from_block_time),
            error,
            account_keys,
            pre_balances,
            post_balances,
            instructions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAYER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const SOURCE: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";
    const DESTINATION: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";

    fn decode(value: Value) -> TransactionRecord {
        let wire: RpcConfirmedTransaction = serde_json::from_value(value).unwrap();
        TransactionRecord::try_from(wire).unwrap()
    }

    #[test]
    fn test_decode_transfer_checked() {
        let record = decode(json!({
            "slot": 42,
            "blockTime": 1_700_000_000,
            "meta": { "err": null, "preBalances": [10, 0], "postBalances": [5, 0] },
            "transaction": {
                "signatures": ["sig1"],
                "message": {
                    "accountKeys": [
                        { "pubkey": PAYER, "signer": true, "writable": true },
                        { "pubkey": DESTINATION, "signer": false, "writable": true }
                    ],
                    "instructions": [{
                        "program": "spl-token",
                        "programId": TOKEN_PROGRAM,
                        "parsed": {
                            "type": "transferChecked",
                            "info": {
                                "source": SOURCE,
                                "destination": DESTINATION,
                                "mint": DESTINATION,
                                "authority": PAYER,
                                "tokenAmount": { "amount": "15000", "decimals": 6, "uiAmountString": "0.015" }
                            }
                        }
                    }]
                }
            }
        }));
        assert_eq!(record.signature, "sig1");
        assert_eq!(record.slot, 42);
        assert_eq!(record.fee_payer().unwrap().to_string(), PAYER);
        match &record.instructions[0].kind {
            InstructionKind::TokenTransfer(t) => {
                assert_eq!(t.amount, 15_000);
                assert_eq!(t.destination.to_string(), DESTINATION);
                assert!(t.mint.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_keeps_unknown_instructions_and_errors() {
        let record = decode(json!({
            "blockTime": null,
            "meta": {
                "err": { "InstructionError": [0, "Custom"] },
                "preBalances": [100, 0],
                "postBalances": [90, 5]
            },
            "transaction": {
                "signatures": ["sig2"],
                "message": {
                    "accountKeys": [
                        { "pubkey": PAYER, "signer": true },
                        { "pubkey": DESTINATION, "signer": false }
                    ],
                    "instructions": [
                        { "programId": SYSTEM_PROGRAM, "parsed": { "type": "transfer", "info": { "lamports": 5 } } },
                        { "programId": "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr", "parsed": "hello" }
                    ]
                }
            }
        }));
        assert!(record.block_time.is_none());
        assert!(record.error.as_deref().unwrap().contains("InstructionError"));
        assert!(
            record
                .instructions
                .iter()
                .all(|i| i.kind == InstructionKind::Other)
        );
        let destination = Address::from_str(DESTINATION).unwrap();
        let index = record.account_index(&destination).unwrap();
        assert_eq!(record.balance_delta(index), Some(5));
        assert_eq!(record.balance_delta(7), None);
    }

    #[test]
    fn test_decode_rejects_bad_account_key() {
        let wire: RpcConfirmedTransaction = serde_json::from_value(json!({
            "transaction": {
                "signatures": ["sig3"],
                "message": { "accountKeys": [{ "pubkey": "nope" }], "instructions": [] }
            }
        }))
        .unwrap();
        assert!(TransactionRecord::try_from(wire).is_err());
    }
}
