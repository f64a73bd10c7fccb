use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcRequest;
use solana_commitment_config::CommitmentConfig;
use solana_signature::Signature;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::ledger::{Commitment, LedgerClient, LedgerError};
use crate::chain::record::{RpcConfirmedTransaction, TransactionRecord};
use crate::chain::types::Address;

/// [`LedgerClient`] backed by a Solana JSON-RPC node.
///
/// Every request is bounded by `timeout`; dropping the returned future abandons the request.
pub struct SolanaRpcLedger {
    rpc_client: Arc<RpcClient>,
    timeout: Duration,
}

impl Debug for SolanaRpcLedger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaRpcLedger")
            .field("rpc_url", &self.rpc_client.url())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SolanaRpcLedger {
    pub fn new(rpc_url: String, timeout: Duration) -> Self {
        tracing::info!(rpc = rpc_url, ?timeout, "Using Solana RPC ledger");
        let rpc_client =
            RpcClient::new_with_timeout_and_commitment(rpc_url, timeout, CommitmentConfig::confirmed());
        Self {
            rpc_client: Arc::new(rpc_client),
            timeout,
        }
    }

    #[allow(dead_code)] // Public for consumption by downstream crates.
    pub fn rpc_client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.rpc_client)
    }

    async fn bounded<T, F>(&self, request: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, solana_client::client_error::ClientError>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(LedgerError::Timeout(self.timeout)),
        }
    }
}

#[async_trait::async_trait]
impl LedgerClient for SolanaRpcLedger {
    async fn get_transaction(
        &self,
        signature: &str,
        commitment: Commitment,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let signature = Signature::from_str(signature)
            .map_err(|_| LedgerError::MalformedSignature(signature.to_string()))?;
        let params = json!([
            signature.to_string(),
            {
                "encoding": "jsonParsed",
                "commitment": commitment.as_str(),
                "maxSupportedTransactionVersion": 0
            }
        ]);
        // getTransaction answers `null` for unknown signatures.
        let response = self
            .bounded(
                self.rpc_client
                    .send::<Option<RpcConfirmedTransaction>>(RpcRequest::GetTransaction, params),
            )
            .await?;
        let record = response.map(TransactionRecord::try_from).transpose()?;
        tracing::debug!(%signature, %commitment, found = record.is_some(), "Fetched transaction");
        Ok(record)
    }

    async fn get_balance(
        &self,
        address: &Address,
        commitment: Commitment,
    ) -> Result<u64, LedgerError> {
        let response = self
            .bounded(
                self.rpc_client
                    .get_balance_with_commitment(address.pubkey(), commitment.into()),
            )
            .await?;
        Ok(response.value)
    }
}
