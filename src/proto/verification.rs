use serde::{Deserialize, Serialize, Serializer};

use crate::chain::Address;
use crate::timestamp::UnixTimestamp;
use crate::util::money_amount::MoneyAmount;

/// A value transfer extracted from a transaction. Amount is in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    pub source: Address,
    pub destination: Address,
    pub amount: u64,
}

/// Why a submitted transaction does not satisfy a challenge.
///
/// These are verdicts, not faults: the ledger answered and the answer was "no".
/// The [`Display`](std::fmt::Display) output is the reason string reported to payers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    #[error("Transaction not found")]
    NotFound,
    #[error("Transaction too old: {age}s (max {max_age}s)")]
    Stale { age: u64, max_age: u64 },
    #[error("Transaction too old: block time unavailable")]
    MissingBlockTime,
    #[error("Transaction failed: {0}")]
    ExecutionFailed(String),
    #[error("No transfer found in transaction")]
    NoTransferFound,
    #[error("Payment sent to wrong address")]
    WrongRecipient { expected: Address, actual: Address },
    #[error("Amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch {
        expected: MoneyAmount,
        actual: MoneyAmount,
    },
    #[error("Payment already used")]
    AlreadyConsumed,
}

/// Details of an accepted payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub signature: String,
    /// Amount received, in display units.
    ///
    /// Serialized as a decimal string such as `"0.01"`, not a JSON number: token amounts
    /// can carry up to 18 decimals and base-unit values beyond 2^53, which a float-backed
    /// JSON reader would round.
    pub amount: MoneyAmount,
    /// Asset label, `SOL` or the token symbol.
    pub token: String,
    pub from: Address,
    pub to: Address,
    pub timestamp: UnixTimestamp,
}

/// Outcome of checking a transaction against a challenge.
///
/// Serializes as `{"valid": true, "signature": ..., ...}` or `{"valid": false, "error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentVerification {
    Valid(PaymentReceipt),
    Invalid(VerificationFailure),
}

impl PaymentVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, PaymentVerification::Valid(_))
    }

    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        match self {
            PaymentVerification::Valid(receipt) => Some(receipt),
            PaymentVerification::Invalid(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&VerificationFailure> {
        match self {
            PaymentVerification::Valid(_) => None,
            PaymentVerification::Invalid(failure) => Some(failure),
        }
    }
}

impl From<VerificationFailure> for PaymentVerification {
    fn from(value: VerificationFailure) -> Self {
        PaymentVerification::Invalid(value)
    }
}

impl From<PaymentReceipt> for PaymentVerification {
    fn from(value: PaymentReceipt) -> Self {
        PaymentVerification::Valid(value)
    }
}

#[derive(Serialize)]
struct PaymentVerificationWire<'a> {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<&'a Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<&'a UnixTimestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Serialize for PaymentVerification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            PaymentVerification::Valid(receipt) => PaymentVerificationWire {
                valid: true,
                signature: Some(&receipt.signature),
                amount: Some(receipt.amount.to_string()),
                token: Some(&receipt.token),
                from: Some(&receipt.from),
                to: Some(&receipt.to),
                timestamp: Some(&receipt.timestamp),
                error: None,
            },
            PaymentVerification::Invalid(failure) => PaymentVerificationWire {
                valid: false,
                signature: None,
                amount: None,
                token: None,
                from: None,
                to: None,
                timestamp: None,
                error: Some(failure.to_string()),
            },
        };
        wire.serialize(serializer)
    }
}

/// Confirmation depth reached by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub confirmed: bool,
    pub finalized: bool,
}
