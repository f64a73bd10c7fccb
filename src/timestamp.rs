//! Unix timestamp utilities for payment freshness windows.
//!
//! Solana reports `blockTime` as signed seconds since the Unix epoch. [`UnixTimestamp`]
//! normalizes that into an unsigned value and provides the age arithmetic the verifier
//! needs to reject stale payments.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::SystemTime;

/// A Unix timestamp representing seconds since the Unix epoch (1970-01-01T00:00:00Z).
///
/// # Serialization
///
/// Serialized as a stringified integer to avoid loss of precision in JSON, since
/// JavaScript's `Number` type cannot safely represent all 64-bit integers.
///
/// ```json
/// "1699999999"
/// ```
///
/// # Example
///
/// ```
/// use x402_solana_gate::timestamp::UnixTimestamp;
///
/// let block_time = UnixTimestamp::from_secs(1_700_000_000);
/// let now = block_time + 42;
/// assert_eq!(block_time.age_at(now), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnixTimestamp(u64);

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let ts = s
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer"))?;
        Ok(UnixTimestamp(ts))
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0.saturating_add(rhs))
    }
}

impl UnixTimestamp {
    /// Creates a new [`UnixTimestamp`] from a raw seconds value.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Converts a ledger `blockTime`. Pre-epoch values are not meaningful and yield `None`.
    pub fn from_block_time(block_time: i64) -> Option<Self> {
        u64::try_from(block_time).ok().map(Self)
    }

    /// Returns the current system time as a [`UnixTimestamp`].
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set to a time before the Unix epoch.
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("SystemTime before UNIX epoch?!?")
            .as_secs();
        Self(now)
    }

    /// Returns the timestamp as raw seconds since the Unix epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed between `self` and `now`. A timestamp in the future has age zero.
    pub fn age_at(&self, now: UnixTimestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_of_future_timestamp_is_zero() {
        let now = UnixTimestamp::from_secs(100);
        let ahead = UnixTimestamp::from_secs(130);
        assert_eq!(ahead.age_at(now), 0);
    }

    #[test]
    fn test_from_negative_block_time() {
        assert_eq!(UnixTimestamp::from_block_time(-5), None);
        assert_eq!(
            UnixTimestamp::from_block_time(1_700_000_000),
            Some(UnixTimestamp::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&UnixTimestamp::from_secs(1699999999)).unwrap();
        assert_eq!(json, "\"1699999999\"");
    }
}
