use std::sync::Arc;
use tracing::instrument;

use crate::config::ServerConfig;
use crate::proto::{PaymentRequiredResponse, PaymentVerification, VerificationFailure};
use crate::scheme::{
    ChallengeBuilder, InMemoryReplayGuard, PaymentVerifier, ReplayGuard, VerifierError,
};
use crate::timestamp::UnixTimestamp;
use crate::util::money_amount::MoneyAmount;

/// Challenge issuance and single-use payment redemption behind one handle.
///
/// A signature is recorded as consumed only once it has produced a valid verdict, so a
/// payer can retry a transaction that was not yet confirmed.
pub struct PaymentGate<G = InMemoryReplayGuard> {
    challenges: ChallengeBuilder,
    verifier: PaymentVerifier,
    replay_guard: Arc<G>,
}

impl PaymentGate<InMemoryReplayGuard> {
    /// Gate over the configured Solana RPC endpoint with an in-memory replay guard.
    pub fn from_config(config: &ServerConfig) -> Result<Self, VerifierError> {
        Ok(Self::new(
            ChallengeBuilder::new(config)?,
            PaymentVerifier::from_config(config)?,
            Arc::new(InMemoryReplayGuard::new()),
        ))
    }
}

impl<G: ReplayGuard> PaymentGate<G> {
    pub fn new(challenges: ChallengeBuilder, verifier: PaymentVerifier, replay_guard: Arc<G>) -> Self {
        Self {
            challenges,
            verifier,
            replay_guard,
        }
    }

    pub fn verifier(&self) -> &PaymentVerifier {
        &self.verifier
    }

    pub fn replay_guard(&self) -> &Arc<G> {
        &self.replay_guard
    }

    /// The `402 Payment Required` answer for `price`.
    pub fn challenge(
        &self,
        price: &MoneyAmount,
        resource_id: Option<&str>,
    ) -> Result<PaymentRequiredResponse, VerifierError> {
        self.challenges.build_response(price, resource_id)
    }

    /// Verifies `signature` and consumes it on success.
    ///
    /// Of two concurrent redemptions of one valid payment, exactly one is valid; the other
    /// reports `Payment already used`.
    #[instrument(skip_all, err, fields(signature = %signature))]
    pub async fn redeem(
        &self,
        signature: &str,
        price: &MoneyAmount,
    ) -> Result<PaymentVerification, VerifierError> {
        if self.replay_guard.is_consumed(signature) {
            tracing::info!("payment already redeemed");
            return Ok(VerificationFailure::AlreadyConsumed.into());
        }
        let verdict = self.verifier.verify(signature, price).await?;
        if let Some(receipt) = verdict.receipt() {
            if !self.replay_guard.mark_consumed(signature, receipt.timestamp) {
                tracing::info!("payment redeemed concurrently");
                return Ok(VerificationFailure::AlreadyConsumed.into());
            }
        }
        Ok(verdict)
    }

    /// Drops consumed signatures that are too old to pass verification again.
    pub fn prune_consumed(&self) -> usize {
        self.prune_consumed_at(UnixTimestamp::now())
    }

    fn prune_consumed_at(&self, now: UnixTimestamp) -> usize {
        let horizon = now
            .as_secs()
            .saturating_sub(self.verifier.max_age_seconds());
        self.replay_guard.prune(UnixTimestamp::from_secs(horizon))
    }
}
