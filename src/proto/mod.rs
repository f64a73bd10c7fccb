//! Wire format types for the Solana x402 profile.
//!
//! - [`X402Version1`] - Version marker that serializes as `1`
//! - [`PaymentRequirements`] / [`PaymentOption`] - The challenge document
//! - [`PaymentRequiredResponse`] - Status, headers and body of an HTTP 402 answer
//! - [`PaymentVerification`] - The verdict for a submitted transaction
//! - [`PaymentStatus`] - Confirmation depth reached by a transaction

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;

mod requirements;
mod verification;

pub use requirements::*;
pub use verification::*;

/// Version marker for x402 protocol version 1.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct X402Version1;

impl X402Version1 {
    pub const VALUE: u8 = 1;
    /// Value of the `WWW-Authenticate` header sent with every challenge.
    pub const WWW_AUTHENTICATE: &'static str = "x402 version=\"1\"";
}

impl From<X402Version1> for u8 {
    fn from(_: X402Version1) -> Self {
        X402Version1::VALUE
    }
}

impl Serialize for X402Version1 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(Self::VALUE)
    }
}

impl<'de> Deserialize<'de> for X402Version1 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let num = u8::deserialize(deserializer)?;
        if num == Self::VALUE {
            Ok(X402Version1)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected version {}, got {}",
                Self::VALUE,
                num
            )))
        }
    }
}

impl Display for X402Version1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::VALUE)
    }
}
