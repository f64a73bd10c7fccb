use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_pubkey::{Pubkey, pubkey};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Lamports have 9 decimal places relative to SOL.
pub const SOL_DECIMALS: u8 = 9;
pub const SOL_SYMBOL: &str = "SOL";

pub const ATA_PROGRAM_PUBKEY: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const TOKEN_PROGRAM_PUBKEY: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const TOKEN_2022_PROGRAM_PUBKEY: Pubkey =
    pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// A Solana public key address, serialized as base58.
///
/// ```
/// use x402_solana_gate::chain::Address;
/// use std::str::FromStr;
///
/// let addr = Address::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
/// assert_eq!(addr.to_string(), "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
/// ```
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Address(Pubkey);

impl Address {
    pub const fn new(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }

    pub fn pubkey(&self) -> &Pubkey {
        &self.0
    }
}

impl From<Pubkey> for Address {
    fn from(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }
}

impl From<Address> for Pubkey {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to decode Solana address: {0}")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pubkey = Pubkey::from_str(s).map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Self(pubkey))
    }
}

/// The SPL token program that owns a mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TokenProgram {
    #[default]
    #[serde(rename = "spl-token")]
    SplToken,
    #[serde(rename = "spl-token-2022")]
    SplToken2022,
}

impl TokenProgram {
    pub fn id(&self) -> Pubkey {
        match self {
            TokenProgram::SplToken => TOKEN_PROGRAM_PUBKEY,
            TokenProgram::SplToken2022 => TOKEN_2022_PROGRAM_PUBKEY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown token program {0}, expected spl-token or spl-token-2022")]
pub struct UnknownTokenProgramError(String);

impl FromStr for TokenProgram {
    type Err = UnknownTokenProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spl-token" => Ok(TokenProgram::SplToken),
            "spl-token-2022" => Ok(TokenProgram::SplToken2022),
            other => Err(UnknownTokenProgramError(other.to_string())),
        }
    }
}

/// Derives the associated token account of `owner` for `mint` under `program`.
pub fn associated_token_address(owner: &Address, mint: &Address, program: TokenProgram) -> Address {
    let token_program = program.id();
    let (ata, _) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_PUBKEY,
    );
    Address::new(ata)
}

/// An SPL token accepted as payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenAsset {
    /// The SPL token mint address.
    pub mint: Address,
    /// The number of decimal places for this token.
    pub decimals: u8,
    /// Program that owns the mint.
    pub program: TokenProgram,
    /// Display label reported in verdicts.
    pub symbol: String,
}

impl TokenAsset {
    pub fn new(mint: Address, decimals: u8, program: TokenProgram, symbol: &str) -> Self {
        Self {
            mint,
            decimals,
            program,
            symbol: symbol.to_string(),
        }
    }
}

/// What a payment is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Asset {
    /// Lamports, verified by the recipient's balance delta.
    Native,
    /// An SPL token, verified by a transfer instruction into the recipient's token account.
    Token(TokenAsset),
}

impl Asset {
    pub fn decimals(&self) -> u8 {
        match self {
            Asset::Native => SOL_DECIMALS,
            Asset::Token(token) => token.decimals,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Asset::Native => SOL_SYMBOL,
            Asset::Token(token) => token.symbol.as_str(),
        }
    }

    /// Identifier placed in the `token` field of a payment option.
    pub fn identifier(&self) -> String {
        match self {
            Asset::Native => "native".to_string(),
            Asset::Token(token) => token.mint.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_rejects_garbage() {
        assert!(Address::from_str("not-an-address").is_err());
        assert!(serde_json::from_str::<Address>("\"0xdeadbeef\"").is_err());
    }

    #[test]
    fn test_associated_token_address_is_stable_and_program_specific() {
        let owner = Address::from_str("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM").unwrap();
        let mint = Address::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
        let classic = associated_token_address(&owner, &mint, TokenProgram::SplToken);
        assert_eq!(
            classic,
            associated_token_address(&owner, &mint, TokenProgram::SplToken)
        );
        assert_ne!(
            classic,
            associated_token_address(&owner, &mint, TokenProgram::SplToken2022)
        );
        assert_ne!(classic, owner);
    }

    #[test]
    fn test_associated_token_address_matches_known_accounts() {
        let mainnet_usdc = Address::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
        let owner = Address::from_str("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM").unwrap();
        assert_eq!(
            associated_token_address(&owner, &mainnet_usdc, TokenProgram::SplToken).to_string(),
            "FGETo8T8wMcN2wCjav8VK6eh3dLk63evNDPxzLSJra8B"
        );
        assert_eq!(
            associated_token_address(&owner, &mainnet_usdc, TokenProgram::SplToken2022).to_string(),
            "GdjpegrtGwU3pgtzPivYVViSA8rmGL248qBVKzsrU3DD"
        );
        let owner = Address::from_str("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU").unwrap();
        assert_eq!(
            associated_token_address(&owner, &mainnet_usdc, TokenProgram::SplToken).to_string(),
            "CTM9xaqDxrLX753nEWmKsJCRRcAU9GiahV8vRj6LPpjW"
        );
    }

    #[test]
    fn test_asset_labels() {
        assert_eq!(Asset::Native.symbol(), "SOL");
        assert_eq!(Asset::Native.decimals(), 9);
        assert_eq!(Asset::Native.identifier(), "native");
    }
}
