//! Configuration for the payment gate.
//!
//! Configuration is a single JSON document with camelCase keys:
//!
//! ```json
//! {
//!   "network": "devnet",
//!   "recipientAddress": "$RECIPIENT_ADDRESS",
//!   "rpcUrl": "${SOLANA_RPC_URL}",
//!   "asset": "usdc",
//!   "maxAgeSeconds": 300,
//!   "amountTolerance": "0.0001",
//!   "rpcTimeoutSeconds": 30
//! }
//! ```
//!
//! Any value may be given literally or as a `$VAR` / `${VAR}` reference to an environment
//! variable, see [`LiteralOrEnv`]. Omitting `asset` selects native SOL.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::chain::{Address, Asset, TokenAsset, TokenProgram};
use crate::networks::{KnownNetworkSolana, SolanaNetwork, USDC};

/// Largest number of decimals an asset may declare.
pub const MAX_ASSET_DECIMALS: u8 = 18;

/// A configuration value given literally or as an environment variable reference.
///
/// `"$VAR"` and `"${VAR}"` are replaced by the content of `VAR` before parsing. Numbers
/// and booleans may also be written as plain JSON values.
///
/// ```
/// use x402_solana_gate::config::LiteralOrEnv;
///
/// let value: LiteralOrEnv<u64> = serde_json::from_str("300").unwrap();
/// assert_eq!(*value, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    /// Returns the variable name if the string matches `$VAR` or `${VAR}` syntax.
    fn parse_env_var_syntax(s: &str) -> Option<&str> {
        if let Some(name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            Some(name)
        } else if let Some(name) = s.strip_prefix('$') {
            let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
            valid.then_some(name)
        } else {
            None
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = match RawValue::deserialize(deserializer)? {
            RawValue::Text(s) => s,
            RawValue::Number(n) => n.to_string(),
            RawValue::Bool(b) => b.to_string(),
        };
        let value = match Self::parse_env_var_syntax(&raw) {
            Some(var_name) => std::env::var(var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{}' not found (referenced as '{}')",
                    var_name, raw
                ))
            })?,
            None => raw,
        };
        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {}", e)))?;
        Ok(LiteralOrEnv(parsed))
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Knobs of the verification state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Oldest acceptable transaction, in seconds.
    pub max_age_seconds: u64,
    /// Native mode slack around the expected amount, in display units.
    pub amount_tolerance: Decimal,
    /// Upper bound for each ledger request.
    pub rpc_timeout: Duration,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        VerifierSettings {
            max_age_seconds: config_defaults::DEFAULT_MAX_AGE_SECONDS,
            amount_tolerance: config_defaults::default_amount_tolerance().into_inner(),
            rpc_timeout: Duration::from_secs(config_defaults::DEFAULT_RPC_TIMEOUT_SECONDS),
        }
    }
}

/// Server-side payment terms.
///
/// Immutable once a verifier or challenge builder has been built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "config_defaults::default_network")]
    network: LiteralOrEnv<SolanaNetwork>,
    recipient_address: LiteralOrEnv<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rpc_url: Option<LiteralOrEnv<Url>>,
    /// Mint address, `native`, or `usdc`. Absent means native SOL.
    #[serde(default, alias = "assetIdentifier", skip_serializing_if = "Option::is_none")]
    asset: Option<LiteralOrEnv<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decimals: Option<LiteralOrEnv<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_program: Option<LiteralOrEnv<TokenProgram>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    symbol: Option<LiteralOrEnv<String>>,
    #[serde(default = "config_defaults::default_max_age_seconds")]
    max_age_seconds: LiteralOrEnv<u64>,
    #[serde(default = "config_defaults::default_amount_tolerance")]
    amount_tolerance: LiteralOrEnv<Decimal>,
    #[serde(default = "config_defaults::default_rpc_timeout_seconds")]
    rpc_timeout_seconds: LiteralOrEnv<u64>,
}

pub mod config_defaults {
    use rust_decimal::Decimal;

    use super::LiteralOrEnv;
    use crate::networks::SolanaNetwork;

    pub const DEFAULT_NETWORK: SolanaNetwork = SolanaNetwork::Devnet;
    pub const DEFAULT_MAX_AGE_SECONDS: u64 = 300;
    /// 0.0001 display units.
    pub const DEFAULT_AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);
    pub const DEFAULT_RPC_TIMEOUT_SECONDS: u64 = 30;

    pub fn default_network() -> LiteralOrEnv<SolanaNetwork> {
        LiteralOrEnv::from_literal(DEFAULT_NETWORK)
    }

    pub fn default_max_age_seconds() -> LiteralOrEnv<u64> {
        LiteralOrEnv::from_literal(DEFAULT_MAX_AGE_SECONDS)
    }

    pub fn default_amount_tolerance() -> LiteralOrEnv<Decimal> {
        LiteralOrEnv::from_literal(DEFAULT_AMOUNT_TOLERANCE)
    }

    pub fn default_rpc_timeout_seconds() -> LiteralOrEnv<u64> {
        LiteralOrEnv::from_literal(DEFAULT_RPC_TIMEOUT_SECONDS)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

impl ServerConfig {
    /// Terms for native SOL payments to `recipient_address`, with default settings.
    pub fn new(network: SolanaNetwork, recipient_address: impl Into<String>) -> Self {
        ServerConfig {
            network: LiteralOrEnv::from_literal(network),
            recipient_address: LiteralOrEnv::from_literal(recipient_address.into()),
            rpc_url: None,
            asset: None,
            decimals: None,
            token_program: None,
            symbol: None,
            max_age_seconds: config_defaults::default_max_age_seconds(),
            amount_tolerance: config_defaults::default_amount_tolerance(),
            rpc_timeout_seconds: config_defaults::default_rpc_timeout_seconds(),
        }
    }

    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = Some(LiteralOrEnv::from_literal(asset.into()));
        self
    }

    pub fn with_token_details(mut self, decimals: u8, program: TokenProgram, symbol: &str) -> Self {
        self.decimals = Some(LiteralOrEnv::from_literal(decimals));
        self.token_program = Some(LiteralOrEnv::from_literal(program));
        self.symbol = Some(LiteralOrEnv::from_literal(symbol.to_string()));
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: Url) -> Self {
        self.rpc_url = Some(LiteralOrEnv::from_literal(rpc_url));
        self
    }

    pub fn with_max_age_seconds(mut self, max_age_seconds: u64) -> Self {
        self.max_age_seconds = LiteralOrEnv::from_literal(max_age_seconds);
        self
    }

    pub fn with_amount_tolerance(mut self, tolerance: Decimal) -> Self {
        self.amount_tolerance = LiteralOrEnv::from_literal(tolerance);
        self
    }

    /// Load configuration from a JSON file.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        let config: ServerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn network(&self) -> SolanaNetwork {
        *self.network
    }

    /// The recipient as written in configuration, not yet validated.
    pub fn recipient_address(&self) -> &str {
        self.recipient_address.as_str()
    }

    /// The validated recipient account.
    pub fn recipient(&self) -> Result<Address, ConfigError> {
        Address::from_str(self.recipient_address())
            .map_err(|e| ConfigError::invalid("recipientAddress", e.to_string()))
    }

    /// The configured RPC endpoint, or the public endpoint of the network.
    pub fn rpc_url(&self) -> String {
        match &self.rpc_url {
            Some(url) => url.to_string(),
            None => self.network().default_rpc_url().to_string(),
        }
    }

    pub fn settings(&self) -> Result<VerifierSettings, ConfigError> {
        let amount_tolerance = *self.amount_tolerance;
        if amount_tolerance.is_sign_negative() {
            return Err(ConfigError::invalid(
                "amountTolerance",
                "must not be negative",
            ));
        }
        Ok(VerifierSettings {
            max_age_seconds: *self.max_age_seconds,
            amount_tolerance,
            rpc_timeout: Duration::from_secs(*self.rpc_timeout_seconds),
        })
    }

    /// Resolves the payment asset.
    ///
    /// `native` (or no asset) selects SOL. `usdc` selects the network's USDC deployment. Any
    /// other value must be a mint address; a mint other than the network's USDC needs
    /// explicit `decimals`.
    pub fn asset(&self) -> Result<Asset, ConfigError> {
        let network = self.network();
        let identifier = self.asset.as_ref().map(|a| a.trim().to_string());
        let asset = match identifier.as_deref() {
            None | Some("") => Asset::Native,
            Some(id) if id.eq_ignore_ascii_case("native") || id.eq_ignore_ascii_case("sol") => {
                Asset::Native
            }
            Some(id) if id.eq_ignore_ascii_case("usdc") => Asset::Token(self.customize(USDC::on(network))),
            Some(mint) => {
                let mint = Address::from_str(mint)
                    .map_err(|e| ConfigError::invalid("asset", e.to_string()))?;
                let usdc = USDC::on(network);
                if mint == usdc.mint {
                    Asset::Token(self.customize(usdc))
                } else {
                    let decimals = self.decimals.as_deref().copied().ok_or_else(|| {
                        ConfigError::invalid("decimals", format!("required for mint {mint}"))
                    })?;
                    let symbol = self
                        .symbol
                        .as_deref()
                        .cloned()
                        .unwrap_or_else(|| mint.to_string());
                    let program = self.token_program.as_deref().copied().unwrap_or_default();
                    Asset::Token(TokenAsset::new(mint, decimals, program, &symbol))
                }
            }
        };
        if asset.decimals() > MAX_ASSET_DECIMALS {
            return Err(ConfigError::invalid(
                "decimals",
                format!("{} exceeds {}", asset.decimals(), MAX_ASSET_DECIMALS),
            ));
        }
        Ok(asset)
    }

    /// Applies explicit overrides on top of a known token deployment.
    fn customize(&self, mut token: TokenAsset) -> TokenAsset {
        if let Some(decimals) = self.decimals.as_deref() {
            token.decimals = *decimals;
        }
        if let Some(program) = self.token_program.as_deref() {
            token.program = *program;
        }
        if let Some(symbol) = self.symbol.as_deref() {
            token.symbol = symbol.clone();
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RECIPIENT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn parse(value: serde_json::Value) -> ServerConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(json!({ "recipientAddress": RECIPIENT }));
        assert_eq!(config.network(), SolanaNetwork::Devnet);
        assert_eq!(config.rpc_url(), "https://api.devnet.solana.com");
        assert_eq!(config.asset().unwrap(), Asset::Native);
        assert_eq!(config.settings().unwrap(), VerifierSettings::default());
        assert_eq!(
            config.settings().unwrap().amount_tolerance.to_string(),
            "0.0001"
        );
    }

    #[test]
    fn test_network_aliases() {
        for (alias, network) in [
            ("solana-devnet", SolanaNetwork::Devnet),
            ("mainnet", SolanaNetwork::MainnetBeta),
            ("solana", SolanaNetwork::MainnetBeta),
            ("mainnet-beta", SolanaNetwork::MainnetBeta),
        ] {
            let config = parse(json!({ "network": alias, "recipientAddress": RECIPIENT }));
            assert_eq!(config.network(), network, "{alias}");
        }
        let result = serde_json::from_value::<ServerConfig>(
            json!({ "network": "testnet", "recipientAddress": RECIPIENT }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_env_var_indirection() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("X402_GATE_TEST_RECIPIENT", RECIPIENT);
            std::env::set_var("X402_GATE_TEST_MAX_AGE", "60");
        }
        let config = parse(json!({
            "recipientAddress": "$X402_GATE_TEST_RECIPIENT",
            "maxAgeSeconds": "${X402_GATE_TEST_MAX_AGE}"
        }));
        assert_eq!(config.recipient().unwrap().to_string(), RECIPIENT);
        assert_eq!(config.settings().unwrap().max_age_seconds, 60);

        let missing = serde_json::from_value::<ServerConfig>(
            json!({ "recipientAddress": "$X402_GATE_TEST_UNSET_VARIABLE" }),
        );
        assert!(missing.is_err());
    }

    #[test]
    fn test_malformed_recipient_is_rejected() {
        let config = parse(json!({ "recipientAddress": "not-a-key" }));
        assert!(matches!(
            config.recipient(),
            Err(ConfigError::InvalidValue {
                field: "recipientAddress",
                ..
            })
        ));
    }

    #[test]
    fn test_usdc_alias_follows_network() {
        let config = parse(json!({
            "network": "mainnet-beta",
            "recipientAddress": RECIPIENT,
            "asset": "USDC",
            "rpcUrl": "https://rpc.example.com/"
        }));
        let Asset::Token(token) = config.asset().unwrap() else {
            panic!("expected token asset");
        };
        assert_eq!(token, USDC::solana());
        assert_eq!(config.rpc_url(), "https://rpc.example.com/");
    }

    #[test]
    fn test_custom_mint_needs_decimals() {
        let mint = "So11111111111111111111111111111111111111112";
        let config = parse(json!({ "recipientAddress": RECIPIENT, "assetIdentifier": mint }));
        assert!(config.asset().is_err());

        let config = parse(json!({
            "recipientAddress": RECIPIENT,
            "asset": mint,
            "decimals": 9,
            "tokenProgram": "spl-token-2022",
            "symbol": "wSOL"
        }));
        let Asset::Token(token) = config.asset().unwrap() else {
            panic!("expected token asset");
        };
        assert_eq!(token.decimals, 9);
        assert_eq!(token.program, TokenProgram::SplToken2022);
        assert_eq!(token.symbol, "wSOL");

        let config = parse(json!({ "recipientAddress": RECIPIENT, "asset": mint, "decimals": 19 }));
        assert!(config.asset().is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let mint = "2b1kV6DkPAnxd5ixfnxCpjxmKwqjjaYmCZfHsFu24GXo";
        let config = ServerConfig::new(SolanaNetwork::MainnetBeta, RECIPIENT)
            .with_asset(mint)
            .with_token_details(6, TokenProgram::SplToken2022, "PYUSD")
            .with_rpc_url(Url::parse("https://rpc.example.com/").unwrap())
            .with_max_age_seconds(45)
            .with_amount_tolerance(Decimal::new(5, 3));
        let Asset::Token(token) = config.asset().unwrap() else {
            panic!("expected token asset");
        };
        assert_eq!(token.mint.to_string(), mint);
        assert_eq!(token.decimals, 6);
        assert_eq!(token.program, TokenProgram::SplToken2022);
        assert_eq!(token.symbol, "PYUSD");
        assert_eq!(config.rpc_url(), "https://rpc.example.com/");
        let settings = config.settings().unwrap();
        assert_eq!(settings.max_age_seconds, 45);
        assert_eq!(settings.amount_tolerance.to_string(), "0.005");
    }

    #[test]
    fn test_negative_tolerance_is_rejected() {
        let config = parse(json!({ "recipientAddress": RECIPIENT, "amountTolerance": "-0.1" }));
        assert!(config.settings().is_err());
    }
}
