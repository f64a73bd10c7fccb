use std::time::SystemTime;

use crate::chain::{Address, Asset};
use crate::config::ServerConfig;
use crate::networks::SolanaNetwork;
use crate::proto::{
    PaymentOption, PaymentRequiredResponse, PaymentRequirements, SOLANA_SCHEME, X402Version1,
};
use crate::scheme::VerifierError;
use crate::util::money_amount::MoneyAmount;

/// Produces payment challenges for the configured recipient and asset.
#[derive(Debug, Clone)]
pub struct ChallengeBuilder {
    network: SolanaNetwork,
    recipient: Address,
    asset: Asset,
}

impl ChallengeBuilder {
    /// Fails with [`VerifierError::InvalidConfig`] if the recipient or asset is malformed.
    pub fn new(config: &ServerConfig) -> Result<Self, VerifierError> {
        Ok(Self {
            network: config.network(),
            recipient: config.recipient()?,
            asset: config.asset()?,
        })
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Builds the challenge document for `price`, in display units.
    ///
    /// Without `resource_id` the option is named `payment-<unix millis>`.
    pub fn build_requirements(
        &self,
        price: &MoneyAmount,
        resource_id: Option<&str>,
    ) -> Result<PaymentRequirements, VerifierError> {
        // A price the asset cannot represent could never be paid exactly.
        price.to_base_units(self.asset.decimals())?;
        let id = match resource_id {
            Some(id) => id.to_string(),
            None => default_resource_id(),
        };
        let option = PaymentOption {
            id,
            scheme: SOLANA_SCHEME.to_string(),
            network: self.network,
            recipient: self.recipient.clone(),
            token: self.asset.identifier(),
            amount: price.to_string(),
            decimals: self.asset.decimals(),
        };
        Ok(PaymentRequirements {
            version: X402Version1,
            payment_options: vec![option],
        })
    }

    /// Builds the full `402 Payment Required` answer for `price`.
    pub fn build_response(
        &self,
        price: &MoneyAmount,
        resource_id: Option<&str>,
    ) -> Result<PaymentRequiredResponse, VerifierError> {
        let requirements = self.build_requirements(price, resource_id)?;
        Ok(PaymentRequiredResponse::new(requirements))
    }
}

fn default_resource_id() -> String {
    let millis = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("payment-{millis}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use http::StatusCode;
    use serde_json::json;

    const RECIPIENT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    #[test]
    fn test_requirements_wire_format() {
        let config = ServerConfig::new(SolanaNetwork::Devnet, RECIPIENT).with_asset("usdc");
        let builder = ChallengeBuilder::new(&config).unwrap();
        let price = MoneyAmount::parse("0.010").unwrap();
        let requirements = builder.build_requirements(&price, Some("article-7")).unwrap();
        assert_eq!(
            serde_json::to_value(&requirements).unwrap(),
            json!({
                "version": 1,
                "paymentOptions": [{
                    "id": "article-7",
                    "scheme": "solana",
                    "network": "devnet",
                    "recipient": RECIPIENT,
                    "token": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
                    "amount": "0.01",
                    "decimals": 6
                }]
            })
        );
        // Same inputs, same document.
        assert_eq!(
            requirements,
            builder.build_requirements(&price, Some("article-7")).unwrap()
        );
    }

    #[test]
    fn test_amount_round_trips() {
        let builder = ChallengeBuilder::new(&ServerConfig::new(SolanaNetwork::Devnet, RECIPIENT))
            .unwrap();
        for input in ["1", "0.5", "0.000000001", "123456.789"] {
            let price = MoneyAmount::parse(input).unwrap();
            let requirements = builder.build_requirements(&price, None).unwrap();
            assert_eq!(requirements.payment_options.len(), 1);
            let option = &requirements.payment_options[0];
            assert_eq!(MoneyAmount::parse(&option.amount).unwrap(), price);
            assert_eq!(option.token, "native");
            assert_eq!(option.decimals, 9);
            assert!(option.id.starts_with("payment-"));
        }
    }

    #[test]
    fn test_response_headers() {
        let builder = ChallengeBuilder::new(&ServerConfig::new(SolanaNetwork::MainnetBeta, RECIPIENT))
            .unwrap();
        let price = MoneyAmount::parse("0.25").unwrap();
        let response = builder.build_response(&price, Some("r")).unwrap();
        assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(response.headers["content-type"], "application/json");
        assert_eq!(response.headers["www-authenticate"], "x402 version=\"1\"");
        let value = response.to_json();
        assert_eq!(value["statusCode"], json!(402));
        assert_eq!(value["body"]["paymentOptions"][0]["network"], json!("mainnet-beta"));
    }

    #[test]
    fn test_rejects_bad_recipient_and_precision() {
        let result = ChallengeBuilder::new(&ServerConfig::new(SolanaNetwork::Devnet, "0xabc"));
        assert!(matches!(
            result,
            Err(VerifierError::InvalidConfig(ConfigError::InvalidValue { .. }))
        ));

        let config = ServerConfig::new(SolanaNetwork::Devnet, RECIPIENT).with_asset("usdc");
        let builder = ChallengeBuilder::new(&config).unwrap();
        let too_precise = MoneyAmount::parse("0.0000001").unwrap();
        assert!(matches!(
            builder.build_requirements(&too_precise, None),
            Err(VerifierError::InvalidPrice(_))
        ));
    }
}
