//! Registry of the Solana networks and well-known token deployments this crate understands.
//!
//! Networks are addressed by their cluster name (`devnet`, `mainnet-beta`) in configuration and
//! on the wire, and by their CAIP-2 identifier (`solana:<genesis hash prefix>`) in logs.

use serde::{Deserialize, Serialize};
use solana_pubkey::pubkey;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::chain::{Address, TokenAsset, TokenProgram};

/// The CAIP-2 namespace for Solana chains.
pub const SOLANA_NAMESPACE: &str = "solana";

/// A Solana cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolanaNetwork {
    /// Public development cluster.
    #[serde(rename = "devnet", alias = "solana-devnet")]
    Devnet,
    /// Production cluster.
    #[serde(rename = "mainnet-beta", alias = "mainnet", alias = "solana")]
    MainnetBeta,
}

impl SolanaNetwork {
    /// Cluster name as used in configuration and in payment options.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolanaNetwork::Devnet => "devnet",
            SolanaNetwork::MainnetBeta => "mainnet-beta",
        }
    }

    /// Public RPC endpoint used when no `rpcUrl` override is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            SolanaNetwork::Devnet => "https://api.devnet.solana.com",
            SolanaNetwork::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }

    /// First 32 characters of the base58-encoded genesis block hash.
    pub fn genesis_reference(&self) -> &'static str {
        match self {
            SolanaNetwork::Devnet => "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
            SolanaNetwork::MainnetBeta => "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
        }
    }

    /// CAIP-2 chain identifier, e.g. `solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1`.
    pub fn chain_id(&self) -> String {
        format!("{}:{}", SOLANA_NAMESPACE, self.genesis_reference())
    }
}

impl Display for SolanaNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown Solana network {0}, expected devnet or mainnet-beta")]
pub struct UnknownNetworkError(String);

impl FromStr for SolanaNetwork {
    type Err = UnknownNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "devnet" | "solana-devnet" => Ok(SolanaNetwork::Devnet),
            "mainnet-beta" | "mainnet" | "solana" => Ok(SolanaNetwork::MainnetBeta),
            other => Err(UnknownNetworkError(other.to_string())),
        }
    }
}

/// Per-network instances of well-known data.
///
/// ```
/// use x402_solana_gate::networks::{KnownNetworkSolana, USDC};
///
/// let usdc = USDC::solana();
/// assert_eq!(usdc.decimals, 6);
/// ```
pub trait KnownNetworkSolana<A> {
    /// Instance for mainnet-beta.
    fn solana() -> A;
    /// Instance for devnet.
    fn solana_devnet() -> A;

    /// Instance for the given network.
    fn on(network: SolanaNetwork) -> A {
        match network {
            SolanaNetwork::Devnet => Self::solana_devnet(),
            SolanaNetwork::MainnetBeta => Self::solana(),
        }
    }
}

/// Marker for the USDC stablecoin.
#[derive(Debug, Clone, Copy)]
pub struct USDC;

impl USDC {
    pub const SYMBOL: &'static str = "USDC";
}

impl KnownNetworkSolana<TokenAsset> for USDC {
    fn solana() -> TokenAsset {
        let mint = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        TokenAsset::new(
            Address::new(mint),
            6,
            TokenProgram::SplToken,
            USDC::SYMBOL,
        )
    }

    fn solana_devnet() -> TokenAsset {
        let mint = pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");
        TokenAsset::new(
            Address::new(mint),
            6,
            TokenProgram::SplToken,
            USDC::SYMBOL,
        )
    }
}
