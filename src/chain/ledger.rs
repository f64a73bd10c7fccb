use solana_client::client_error::ClientError;
use solana_commitment_config::CommitmentConfig;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::record::{RecordDecodeError, TransactionRecord};
use crate::chain::types::Address;

/// Finality level requested from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Commitment {
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl Display for Commitment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Commitment> for CommitmentConfig {
    fn from(value: Commitment) -> Self {
        match value {
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Errors that prevent the ledger from answering at all.
///
/// A transaction that simply does not exist is not an error: it is `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Malformed transaction signature: {0}")]
    MalformedSignature(String),
    #[error("Ledger request timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Transport(Box<ClientError>),
    #[error("Unexpected transaction format: {0}")]
    Decode(#[from] RecordDecodeError),
}

impl From<ClientError> for LedgerError {
    fn from(value: ClientError) -> Self {
        LedgerError::Transport(Box::new(value))
    }
}

/// Read access to the ledger, as needed by the verifier and the status check.
#[async_trait::async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetches a transaction by signature at the requested commitment.
    async fn get_transaction(
        &self,
        signature: &str,
        commitment: Commitment,
    ) -> Result<Option<TransactionRecord>, LedgerError>;

    /// Returns the lamport balance of `address`.
    async fn get_balance(
        &self,
        address: &Address,
        commitment: Commitment,
    ) -> Result<u64, LedgerError>;
}

#[async_trait::async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn get_transaction(
        &self,
        signature: &str,
        commitment: Commitment,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        (**self).get_transaction(signature, commitment).await
    }

    async fn get_balance(
        &self,
        address: &Address,
        commitment: Commitment,
    ) -> Result<u64, LedgerError> {
        (**self).get_balance(address, commitment).await
    }
}
