use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tracing::instrument;

use crate::chain::{
    Address, Asset, Commitment, LedgerClient, SolanaRpcLedger, TransactionRecord,
    associated_token_address,
};
use crate::config::{ConfigError, ServerConfig};
use crate::networks::SolanaNetwork;
use crate::proto::{
    PaymentReceipt, PaymentStatus, PaymentVerification, TransferInfo, VerificationFailure,
};
use crate::scheme::{TransferExtractor, VerifierError};
use crate::timestamp::UnixTimestamp;
use crate::util::money_amount::MoneyAmount;

/// How the received amount is compared with the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountRule {
    /// Token transfers: anything at or above the price.
    AtLeast,
    /// Native balance deltas: the price, give or take this many lamports.
    Within(u64),
}

impl AmountRule {
    fn accepts(&self, expected: u64, actual: u64) -> bool {
        match self {
            AmountRule::AtLeast => actual >= expected,
            AmountRule::Within(tolerance) => actual.abs_diff(expected) <= *tolerance,
        }
    }
}

/// Checks submitted transactions against the configured payment terms.
///
/// Immutable after construction and cheap to share: concurrent calls only meet at the ledger.
pub struct PaymentVerifier {
    ledger: Arc<dyn LedgerClient>,
    network: SolanaNetwork,
    asset: Asset,
    /// Recipient's associated token account in token mode, the recipient itself otherwise.
    expected_destination: Address,
    extractor: TransferExtractor,
    amount_rule: AmountRule,
    max_age_seconds: u64,
}

impl std::fmt::Debug for PaymentVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentVerifier")
            .field("network", &self.network)
            .field("asset", &self.asset)
            .field("expected_destination", &self.expected_destination)
            .field("amount_rule", &self.amount_rule)
            .field("max_age_seconds", &self.max_age_seconds)
            .finish()
    }
}

impl PaymentVerifier {
    /// Builds a verifier reading the ledger through `ledger`.
    pub fn new(config: &ServerConfig, ledger: Arc<dyn LedgerClient>) -> Result<Self, VerifierError> {
        let recipient = config.recipient()?;
        let asset = config.asset()?;
        let settings = config.settings()?;
        let (expected_destination, amount_rule) = match &asset {
            Asset::Native => {
                let tolerance = tolerance_in_base_units(settings.amount_tolerance, asset.decimals())?;
                (recipient.clone(), AmountRule::Within(tolerance))
            }
            Asset::Token(token) => (
                associated_token_address(&recipient, &token.mint, token.program),
                AmountRule::AtLeast,
            ),
        };
        let extractor = TransferExtractor::for_asset(&asset, &recipient);
        tracing::info!(
            network = %config.network(),
            chain_id = %config.network().chain_id(),
            asset = asset.symbol(),
            recipient = %recipient,
            destination = %expected_destination,
            "Payment verifier ready"
        );
        Ok(Self {
            ledger,
            network: config.network(),
            asset,
            expected_destination,
            extractor,
            amount_rule,
            max_age_seconds: settings.max_age_seconds,
        })
    }

    /// Builds a verifier over the configured (or default) Solana RPC endpoint.
    pub fn from_config(config: &ServerConfig) -> Result<Self, VerifierError> {
        let settings = config.settings()?;
        let ledger = SolanaRpcLedger::new(config.rpc_url(), settings.rpc_timeout);
        Self::new(config, Arc::new(ledger))
    }

    pub fn network(&self) -> SolanaNetwork {
        self.network
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn max_age_seconds(&self) -> u64 {
        self.max_age_seconds
    }

    /// Account the payment has to land in.
    pub fn expected_destination(&self) -> &Address {
        &self.expected_destination
    }

    /// Verifies that transaction `signature` pays `price` (display units) with the configured
    /// freshness window.
    ///
    /// Business failures come back as [`PaymentVerification::Invalid`]. Only a malformed
    /// signature, an unusable price or an unreachable ledger is an `Err`.
    pub async fn verify(
        &self,
        signature: &str,
        price: &MoneyAmount,
    ) -> Result<PaymentVerification, VerifierError> {
        self.verify_with_max_age(signature, price, self.max_age_seconds)
            .await
    }

    /// As [`PaymentVerifier::verify`], with an explicit freshness window in seconds.
    #[instrument(skip_all, err, fields(signature = %signature, price = %price, max_age_seconds = max_age_seconds))]
    pub async fn verify_with_max_age(
        &self,
        signature: &str,
        price: &MoneyAmount,
        max_age_seconds: u64,
    ) -> Result<PaymentVerification, VerifierError> {
        let expected = price.to_base_units(self.asset.decimals())?;
        let record = self
            .ledger
            .get_transaction(signature, Commitment::Confirmed)
            .await?;
        let verdict = match record {
            None => PaymentVerification::Invalid(VerificationFailure::NotFound),
            Some(record) => {
                match self.check(&record, expected, max_age_seconds, UnixTimestamp::now())? {
                    Ok((transfer, timestamp)) => PaymentVerification::Valid(PaymentReceipt {
                        signature: record.signature.clone(),
                        amount: self.display_amount(transfer.amount)?,
                        token: self.asset.symbol().to_string(),
                        from: transfer.source,
                        to: transfer.destination,
                        timestamp,
                    }),
                    Err(failure) => PaymentVerification::Invalid(failure),
                }
            }
        };
        match &verdict {
            PaymentVerification::Valid(receipt) => {
                tracing::info!(amount = %receipt.amount, from = %receipt.from, "payment accepted")
            }
            PaymentVerification::Invalid(failure) => {
                tracing::info!(reason = %failure, "payment rejected")
            }
        }
        Ok(verdict)
    }

    /// Runs the checks after a successful fetch, in order: freshness, execution,
    /// extraction, recipient, amount. The inner `Err` is the first failed check.
    fn check(
        &self,
        record: &TransactionRecord,
        expected: u64,
        max_age_seconds: u64,
        now: UnixTimestamp,
    ) -> Result<Result<(TransferInfo, UnixTimestamp), VerificationFailure>, VerifierError> {
        let Some(timestamp) = record.block_time else {
            return Ok(Err(VerificationFailure::MissingBlockTime));
        };
        let age = timestamp.age_at(now);
        if age > max_age_seconds {
            return Ok(Err(VerificationFailure::Stale {
                age,
                max_age: max_age_seconds,
            }));
        }
        if let Some(error) = &record.error {
            return Ok(Err(VerificationFailure::ExecutionFailed(error.clone())));
        }
        let Some(transfer) = self.extractor.extract(record) else {
            return Ok(Err(VerificationFailure::NoTransferFound));
        };
        if transfer.destination != self.expected_destination {
            return Ok(Err(VerificationFailure::WrongRecipient {
                expected: self.expected_destination.clone(),
                actual: transfer.destination,
            }));
        }
        if !self.amount_rule.accepts(expected, transfer.amount) {
            return Ok(Err(VerificationFailure::AmountMismatch {
                expected: self.display_amount(expected)?,
                actual: self.display_amount(transfer.amount)?,
            }));
        }
        Ok(Ok((transfer, timestamp)))
    }

    fn display_amount(&self, base_units: u64) -> Result<MoneyAmount, VerifierError> {
        Ok(MoneyAmount::from_base_units(base_units, self.asset.decimals())?)
    }

    /// Reports whether `signature` is visible at `confirmed` and at `finalized`.
    #[instrument(skip(self), err)]
    pub async fn get_status(&self, signature: &str) -> Result<PaymentStatus, VerifierError> {
        let confirmed = self
            .ledger
            .get_transaction(signature, Commitment::Confirmed)
            .await?
            .is_some();
        let finalized = self
            .ledger
            .get_transaction(signature, Commitment::Finalized)
            .await?
            .is_some();
        Ok(PaymentStatus {
            confirmed,
            finalized,
        })
    }
}

/// Scales a display-unit tolerance to base units, rounding down.
fn tolerance_in_base_units(tolerance: Decimal, decimals: u8) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        field: "amountTolerance",
        reason: format!("{tolerance} is out of range for {decimals} decimals"),
    };
    let factor = 10u64.checked_pow(decimals as u32).ok_or_else(invalid)?;
    tolerance
        .checked_mul(Decimal::from(factor))
        .map(|scaled| scaled.floor())
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(invalid)
}
